//! # Repository Module
//!
//! One repository per table. Every read filters `deleted_at IS NULL` unless
//! its name says otherwise.
//!
//! ## Guarded Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The store is the only arbiter of per-row consistency. Writes that     │
//! │  must not race carry their precondition in the WHERE clause:           │
//! │                                                                         │
//! │  mark_sold     ... WHERE status = 'in_stock' AND deleted_at IS NULL    │
//! │  restore       ... WHERE status = 'sold'     AND sale_id IS ?          │
//! │  adjust_stock  ... SET stock = MAX(stock + ?, 0)                       │
//! │  soft_delete   ... WHERE deleted_at IS NULL                            │
//! │  apply_payment ... WHERE status = 'active'                             │
//! │                                                                         │
//! │  rows_affected() == 0 means "the precondition no longer holds".        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository)
//! - [`InventoryRepository`](inventory::InventoryRepository)
//! - [`CustomerRepository`](customer::CustomerRepository)
//! - [`SaleRepository`](sale::SaleRepository)
//! - [`SwapRepository`](swap::SwapRepository)
//! - [`ReturnRepository`](returns::ReturnRepository)
//! - [`DebtRepository`](debt::DebtRepository)

pub mod customer;
pub mod debt;
pub mod inventory;
pub mod product;
pub mod returns;
pub mod sale;
pub mod swap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use handset_core::EntityKind;

use crate::error::DbResult;

/// Outcome of a soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftDelete {
    /// This call stamped `deleted_at`.
    Deleted,
    /// An earlier call already did.
    AlreadyDeleted,
    /// No such row.
    Missing,
}

/// Stamps `deleted_at` on one row.
///
/// Only one caller can ever observe [`SoftDelete::Deleted`] for a given row,
/// so the orchestrator uses it as the claim before running compensations.
pub async fn soft_delete(pool: &SqlitePool, kind: EntityKind, id: &str) -> DbResult<SoftDelete> {
    let now = Utc::now();
    let table = kind.table();

    debug!(entity = %kind, id = %id, "Soft-deleting");

    let result = sqlx::query(&format!(
        "UPDATE {} SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        table
    ))
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(SoftDelete::Deleted);
    }

    let exists: Option<i64> = sqlx::query_scalar(&format!("SELECT 1 FROM {} WHERE id = ?1", table))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(match exists {
        Some(_) => SoftDelete::AlreadyDeleted,
        None => SoftDelete::Missing,
    })
}
