//! # Return Repository
//!
//! Returns keep their lines as JSON, like sales.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use handset_core::{line_items, RefundMethod, Return, ReturnStatus};

const RETURN_COLUMNS: &str = "id, return_number, sale_id, customer_id, items, \
     refund_amount_cents, refund_method, status, reason, notes, created_at, updated_at, \
     deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    id: String,
    return_number: String,
    sale_id: Option<String>,
    customer_id: Option<String>,
    items: String,
    refund_amount_cents: i64,
    refund_method: RefundMethod,
    status: ReturnStatus,
    reason: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ReturnRow> for Return {
    fn from(row: ReturnRow) -> Self {
        Return {
            id: row.id,
            return_number: row.return_number,
            sale_id: row.sale_id,
            customer_id: row.customer_id,
            items: line_items::decode(&row.items),
            refund_amount_cents: row.refund_amount_cents,
            refund_method: row.refund_method,
            status: row.status,
            reason: row.reason,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Return>> {
        let row = sqlx::query_as::<_, ReturnRow>(&format!(
            "SELECT {} FROM returns WHERE id = ?1 AND deleted_at IS NULL",
            RETURN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Return::from))
    }

    /// Live returns, newest first.
    pub async fn list(&self) -> DbResult<Vec<Return>> {
        let rows = sqlx::query_as::<_, ReturnRow>(&format!(
            "SELECT {} FROM returns WHERE deleted_at IS NULL ORDER BY created_at DESC, id",
            RETURN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Return::from).collect())
    }

    pub async fn insert(&self, ret: &Return) -> DbResult<()> {
        debug!(id = %ret.id, return_number = %ret.return_number, "Inserting return");

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, return_number, sale_id, customer_id, items,
                refund_amount_cents, refund_method, status, reason, notes,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&ret.id)
        .bind(&ret.return_number)
        .bind(&ret.sale_id)
        .bind(&ret.customer_id)
        .bind(line_items::encode(&ret.items))
        .bind(ret.refund_amount_cents)
        .bind(ret.refund_method)
        .bind(ret.status)
        .bind(&ret.reason)
        .bind(&ret.notes)
        .bind(ret.created_at)
        .bind(ret.updated_at)
        .bind(ret.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Moves a return to `to`, but only if it is still in `from`.
    ///
    /// Returns `false` when another writer changed the status first, which
    /// keeps the credit side effect of a transition from running twice.
    pub async fn transition_status(
        &self,
        id: &str,
        from: ReturnStatus,
        to: ReturnStatus,
    ) -> DbResult<bool> {
        debug!(id = %id, from = ?from, to = ?to, "Transitioning return status");

        let result = sqlx::query(
            r#"
            UPDATE returns SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.get_by_id(id).await?.is_none() {
            return Err(DbError::not_found("Return", id));
        }

        Ok(result.rows_affected() == 1)
    }
}
