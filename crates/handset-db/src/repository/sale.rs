//! # Sale Repository
//!
//! Sales with their lines stored as a JSON array in `sales.items`.
//!
//! ## Row Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales row                          Sale                                │
//! │  ─────────                          ────                                │
//! │  items  TEXT '[{"productId":..}]' ─► Vec<SaleItem>  (lenient decode)   │
//! │  status TEXT NULL                 ─► SaleStatus::Completed             │
//! │  status TEXT 'pending'            ─► SaleStatus::Pending               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use handset_core::{line_items, PaymentMethod, Sale, SaleItem, SaleStatus, SaleTotals};

const SALE_COLUMNS: &str = "id, sale_number, customer_id, cashier_id, items, subtotal_cents, \
     tax_cents, discount_cents, total_cents, status, payment_method, notes, created_at, \
     updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    sale_number: String,
    customer_id: Option<String>,
    cashier_id: Option<String>,
    items: String,
    subtotal_cents: i64,
    tax_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    status: Option<SaleStatus>,
    payment_method: PaymentMethod,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            sale_number: row.sale_number,
            customer_id: row.customer_id,
            cashier_id: row.cashier_id,
            items: line_items::decode(&row.items),
            subtotal_cents: row.subtotal_cents,
            tax_cents: row.tax_cents,
            discount_cents: row.discount_cents,
            total_cents: row.total_cents,
            status: row.status.unwrap_or_default(),
            payment_method: row.payment_method,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE id = ?1 AND deleted_at IS NULL",
            SALE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Sale::from))
    }

    /// Live sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE deleted_at IS NULL ORDER BY created_at DESC, id",
            SALE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, sale_number, customer_id, cashier_id, items,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                status, payment_method, notes,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.sale_number)
        .bind(&sale.customer_id)
        .bind(&sale.cashier_id)
        .bind(line_items::encode(&sale.items))
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrites every mutable column of a live sale.
    pub async fn update(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, status = ?sale.status, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_id = ?2,
                items = ?3,
                subtotal_cents = ?4,
                tax_cents = ?5,
                discount_cents = ?6,
                total_cents = ?7,
                status = ?8,
                payment_method = ?9,
                notes = ?10,
                updated_at = ?11
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(line_items::encode(&sale.items))
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(&sale.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        Ok(())
    }

    /// Replaces only the lines and totals, leaving status and notes alone.
    pub async fn update_lines(&self, id: &str, items: &[SaleItem], totals: SaleTotals) -> DbResult<()> {
        debug!(id = %id, lines = items.len(), "Rewriting sale lines");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                items = ?2,
                subtotal_cents = ?3,
                tax_cents = ?4,
                discount_cents = ?5,
                total_cents = ?6,
                updated_at = ?7
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(line_items::encode(items))
        .bind(totals.subtotal_cents)
        .bind(totals.tax_cents)
        .bind(totals.discount_cents)
        .bind(totals.total_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }
}
