//! # Debt Repository
//!
//! Customer debts and their append-only payment history.
//!
//! ## Payment Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE debts SET paid += amount, status = (paid >= amount ? paid)   │
//! │      WHERE id = ? AND status = 'active' AND deleted_at IS NULL         │
//! │      RETURNING *            ── no row: ROLLBACK, Ok(None)              │
//! │    INSERT INTO debt_payments ...                                        │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use handset_core::{Debt, DebtPayment};

const DEBT_COLUMNS: &str =
    "id, customer_id, sale_id, amount_cents, paid_cents, status, notes, created_at, updated_at, deleted_at";

#[derive(Debug, Clone)]
pub struct DebtRepository {
    pool: SqlitePool,
}

impl DebtRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DebtRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Debt>> {
        let debt = sqlx::query_as::<_, Debt>(&format!(
            "SELECT {} FROM debts WHERE id = ?1 AND deleted_at IS NULL",
            DEBT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(debt)
    }

    pub async fn list_by_sale(&self, sale_id: &str) -> DbResult<Vec<Debt>> {
        let debts = sqlx::query_as::<_, Debt>(&format!(
            "SELECT {} FROM debts WHERE sale_id = ?1 AND deleted_at IS NULL ORDER BY created_at, id",
            DEBT_COLUMNS
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(debts)
    }

    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Debt>> {
        let debts = sqlx::query_as::<_, Debt>(&format!(
            "SELECT {} FROM debts WHERE customer_id = ?1 AND deleted_at IS NULL ORDER BY created_at, id",
            DEBT_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(debts)
    }

    pub async fn insert(&self, debt: &Debt) -> DbResult<()> {
        debug!(id = %debt.id, amount_cents = %debt.amount_cents, "Inserting debt");

        sqlx::query(
            r#"
            INSERT INTO debts (
                id, customer_id, sale_id, amount_cents, paid_cents, status, notes,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&debt.id)
        .bind(&debt.customer_id)
        .bind(&debt.sale_id)
        .bind(debt.amount_cents)
        .bind(debt.paid_cents)
        .bind(debt.status)
        .bind(&debt.notes)
        .bind(debt.created_at)
        .bind(debt.updated_at)
        .bind(debt.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adds a payment to an active debt and appends the payment row, both in
    /// one transaction.
    ///
    /// Returns the updated debt, or `None` if the debt is no longer active
    /// (already paid, deleted or missing). Nothing is written in that case.
    pub async fn apply_payment(&self, payment: &DebtPayment) -> DbResult<Option<Debt>> {
        debug!(
            debt_id = %payment.debt_id,
            amount_cents = %payment.amount_cents,
            "Applying debt payment"
        );

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Debt>(&format!(
            r#"
            UPDATE debts SET
                paid_cents = paid_cents + ?2,
                status = CASE WHEN paid_cents + ?2 >= amount_cents THEN 'paid' ELSE 'active' END,
                updated_at = ?3
            WHERE id = ?1 AND status = 'active' AND deleted_at IS NULL
            RETURNING {}
            "#,
            DEBT_COLUMNS
        ))
        .bind(&payment.debt_id)
        .bind(payment.amount_cents)
        .bind(payment.date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(debt) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO debt_payments (id, debt_id, amount_cents, date, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.debt_id)
        .bind(payment.amount_cents)
        .bind(payment.date)
        .bind(&payment.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(debt))
    }

    /// Payment history of one debt, oldest first.
    pub async fn list_payments(&self, debt_id: &str) -> DbResult<Vec<DebtPayment>> {
        let payments = sqlx::query_as::<_, DebtPayment>(
            r#"
            SELECT id, debt_id, amount_cents, date, notes
            FROM debt_payments
            WHERE debt_id = ?1
            ORDER BY date, id
            "#,
        )
        .bind(debt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}
