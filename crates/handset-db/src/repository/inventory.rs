//! # Inventory Repository
//!
//! Per-unit ledger of IMEI-tracked handsets.
//!
//! ## Unit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   insert ──► in_stock ──mark_sold──► sold                               │
//! │                 ▲                      │                                │
//! │                 └──────restore─────────┘  (undo of that sale only)      │
//! │                                                                         │
//! │   Both transitions are guarded: a write whose precondition no longer   │
//! │   holds affects zero rows and returns false.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use handset_core::{InventoryItem, InventoryStatus};

const ITEM_COLUMNS: &str = "id, product_id, imei, status, condition, sale_id, customer_id, \
     sold_date, notes, created_at, updated_at, deleted_at";

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory_items WHERE id = ?1 AND deleted_at IS NULL",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// The live unit carrying `imei`, if any. IMEIs are stored normalised.
    pub async fn find_by_imei(&self, imei: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory_items WHERE imei = ?1 AND deleted_at IS NULL",
            ITEM_COLUMNS
        ))
        .bind(imei)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// In-stock units of a product, oldest first (FIFO order).
    pub async fn list_in_stock(&self, product_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory_items \
             WHERE product_id = ?1 AND status = 'in_stock' AND deleted_at IS NULL \
             ORDER BY created_at, id",
            ITEM_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Live units stamped with this sale.
    pub async fn list_by_sale(&self, sale_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory_items \
             WHERE sale_id = ?1 AND deleted_at IS NULL ORDER BY created_at, id",
            ITEM_COLUMNS
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Count of live in-stock units: the stock of a tracked product.
    pub async fn count_in_stock(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_items \
             WHERE product_id = ?1 AND status = 'in_stock' AND deleted_at IS NULL",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Inserts a unit. A live duplicate IMEI fails with
    /// [`DbError::UniqueViolation`].
    pub async fn insert(&self, item: &InventoryItem) -> DbResult<InventoryItem> {
        debug!(id = %item.id, imei = %item.imei, "Inserting inventory item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, product_id, imei, status, condition, sale_id, customer_id,
                sold_date, notes, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.product_id)
        .bind(&item.imei)
        .bind(item.status)
        .bind(item.condition)
        .bind(&item.sale_id)
        .bind(&item.customer_id)
        .bind(item.sold_date)
        .bind(&item.notes)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &item.imei),
            other => other,
        })?;

        Ok(item.clone())
    }

    /// `in_stock -> sold`, stamping the sale. Returns `false` when the unit
    /// was no longer in stock (the optimistic guard failed).
    pub async fn mark_sold(
        &self,
        id: &str,
        sale_id: Option<&str>,
        customer_id: Option<&str>,
        sold_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, sale_id = ?sale_id, "Marking unit sold");

        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                status = ?2,
                sale_id = ?3,
                customer_id = ?4,
                sold_date = ?5,
                updated_at = ?5
            WHERE id = ?1 AND status = 'in_stock' AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(InventoryStatus::Sold)
        .bind(sale_id)
        .bind(customer_id)
        .bind(sold_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// `sold -> in_stock`, clearing the sale stamps.
    ///
    /// With `sale_id` set, only a unit sold to that sale is restored; a unit
    /// that has since been resold elsewhere is left alone.
    pub async fn restore(&self, id: &str, sale_id: Option<&str>) -> DbResult<bool> {
        debug!(id = %id, sale_id = ?sale_id, "Restoring unit to stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                status = ?2,
                sale_id = NULL,
                customer_id = NULL,
                sold_date = NULL,
                updated_at = ?4
            WHERE id = ?1
              AND status = 'sold'
              AND deleted_at IS NULL
              AND (?3 IS NULL OR sale_id = ?3)
            "#,
        )
        .bind(id)
        .bind(InventoryStatus::InStock)
        .bind(sale_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
