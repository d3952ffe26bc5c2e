//! # Customer Repository
//!
//! Customers and their signed store-credit balance.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use handset_core::Customer;

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, store_credit_cents, created_at, updated_at, deleted_at
            FROM customers
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, store_credit_cents, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.store_credit_cents)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(customer.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    /// Adds a signed delta to the balance in one statement. Returns the new
    /// balance. No floor: consumption is validated by the caller.
    pub async fn adjust_store_credit(&self, id: &str, delta_cents: i64) -> DbResult<i64> {
        debug!(id = %id, delta_cents = %delta_cents, "Adjusting store credit");

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE customers
            SET store_credit_cents = store_credit_cents + ?2, updated_at = ?3
            WHERE id = ?1 AND deleted_at IS NULL
            RETURNING store_credit_cents
            "#,
        )
        .bind(id)
        .bind(delta_cents)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        balance.ok_or_else(|| DbError::not_found("Customer", id))
    }
}
