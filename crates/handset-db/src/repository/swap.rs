//! # Swap Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use handset_core::Swap;

const SWAP_COLUMNS: &str = "id, swap_number, customer_id, purchased_product_id, purchased_imei, \
     inventory_item_id, trade_in_product_id, trade_in_imei, trade_in_condition, \
     trade_in_value_cents, difference_paid_cents, status, notes, created_at, updated_at, \
     deleted_at";

#[derive(Debug, Clone)]
pub struct SwapRepository {
    pool: SqlitePool,
}

impl SwapRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SwapRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Swap>> {
        let swap = sqlx::query_as::<_, Swap>(&format!(
            "SELECT {} FROM swaps WHERE id = ?1 AND deleted_at IS NULL",
            SWAP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(swap)
    }

    /// Live swaps, newest first.
    pub async fn list(&self) -> DbResult<Vec<Swap>> {
        let swaps = sqlx::query_as::<_, Swap>(&format!(
            "SELECT {} FROM swaps WHERE deleted_at IS NULL ORDER BY created_at DESC, id",
            SWAP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(swaps)
    }

    pub async fn insert(&self, swap: &Swap) -> DbResult<()> {
        debug!(id = %swap.id, swap_number = %swap.swap_number, "Inserting swap");

        sqlx::query(
            r#"
            INSERT INTO swaps (
                id, swap_number, customer_id, purchased_product_id, purchased_imei,
                inventory_item_id, trade_in_product_id, trade_in_imei, trade_in_condition,
                trade_in_value_cents, difference_paid_cents, status, notes,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&swap.id)
        .bind(&swap.swap_number)
        .bind(&swap.customer_id)
        .bind(&swap.purchased_product_id)
        .bind(&swap.purchased_imei)
        .bind(&swap.inventory_item_id)
        .bind(&swap.trade_in_product_id)
        .bind(&swap.trade_in_imei)
        .bind(swap.trade_in_condition)
        .bind(swap.trade_in_value_cents)
        .bind(swap.difference_paid_cents)
        .bind(swap.status)
        .bind(&swap.notes)
        .bind(swap.created_at)
        .bind(swap.updated_at)
        .bind(swap.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes back the fields settled after creation: the sold unit and
    /// purchased IMEI, status and notes.
    pub async fn update(&self, swap: &Swap) -> DbResult<()> {
        debug!(id = %swap.id, "Updating swap");

        let result = sqlx::query(
            r#"
            UPDATE swaps SET
                purchased_imei = ?2,
                inventory_item_id = ?3,
                status = ?4,
                notes = ?5,
                updated_at = ?6
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(&swap.id)
        .bind(&swap.purchased_imei)
        .bind(&swap.inventory_item_id)
        .bind(swap.status)
        .bind(&swap.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Swap", &swap.id));
        }

        Ok(())
    }
}
