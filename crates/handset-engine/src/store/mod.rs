//! # Record Store Contract
//!
//! Everything the engine needs from persistence, grouped per entity. The
//! engine never sees SQL; it only talks to this trait.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   dyn RecordStore                                                       │
//! │        │                                                                │
//! │        ├── handset_db::Database   (sqlite.rs)   production              │
//! │        └── InMemoryStore          (memory.rs)   tests, fault injection  │
//! │                                                                         │
//! │  Contract shared by both:                                              │
//! │  • every read skips soft-deleted records                               │
//! │  • adjust_stock applies a delta and floors the result at zero          │
//! │  • mark_sold only succeeds while the unit is still in_stock            │
//! │  • restore_item only succeeds for a sold unit (of that sale, if given) │
//! │  • soft_delete reports Deleted exactly once per record                 │
//! │  • apply_debt_payment is atomic: guarded update + payment row          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use handset_core::{
    Customer, Debt, DebtPayment, EntityKind, InventoryItem, Product, Return, ReturnStatus, Sale,
    SaleItem, SaleTotals, Swap,
};

use crate::error::StoreResult;

pub use handset_db::SoftDelete;
pub use memory::{Fault, InMemoryStore};

/// Per-entity CRUD plus the guarded writes the orchestrator relies on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>>;

    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    async fn update_product(&self, product: &Product) -> StoreResult<()>;

    /// Adds `delta` to the stored counter, flooring at zero. Returns the new
    /// value.
    async fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<i64>;

    async fn set_stock(&self, product_id: &str, stock: i64) -> StoreResult<()>;

    // -------------------------------------------------------------------------
    // Inventory items
    // -------------------------------------------------------------------------

    async fn get_item(&self, id: &str) -> StoreResult<Option<InventoryItem>>;

    async fn find_item_by_imei(&self, imei: &str) -> StoreResult<Option<InventoryItem>>;

    /// In-stock units of a product, oldest first.
    async fn list_in_stock(&self, product_id: &str) -> StoreResult<Vec<InventoryItem>>;

    async fn count_in_stock(&self, product_id: &str) -> StoreResult<i64>;

    async fn list_items_by_sale(&self, sale_id: &str) -> StoreResult<Vec<InventoryItem>>;

    async fn insert_item(&self, item: &InventoryItem) -> StoreResult<()>;

    /// Guarded `in_stock -> sold`. `Ok(false)` means the guard failed.
    async fn mark_sold(
        &self,
        item_id: &str,
        sale_id: Option<&str>,
        customer_id: Option<&str>,
        sold_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Guarded `sold -> in_stock`. `Ok(false)` means the unit was not sold
    /// (to that sale).
    async fn restore_item(&self, item_id: &str, sale_id: Option<&str>) -> StoreResult<bool>;

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>>;

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;

    /// Adds a signed delta to the store credit. Returns the new balance.
    async fn adjust_store_credit(&self, customer_id: &str, delta_cents: i64) -> StoreResult<i64>;

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    async fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>>;

    async fn list_sales(&self) -> StoreResult<Vec<Sale>>;

    async fn insert_sale(&self, sale: &Sale) -> StoreResult<()>;

    async fn update_sale(&self, sale: &Sale) -> StoreResult<()>;

    async fn update_sale_lines(
        &self,
        sale_id: &str,
        items: &[SaleItem],
        totals: SaleTotals,
    ) -> StoreResult<()>;

    // -------------------------------------------------------------------------
    // Swaps
    // -------------------------------------------------------------------------

    async fn get_swap(&self, id: &str) -> StoreResult<Option<Swap>>;

    async fn list_swaps(&self) -> StoreResult<Vec<Swap>>;

    async fn insert_swap(&self, swap: &Swap) -> StoreResult<()>;

    async fn update_swap(&self, swap: &Swap) -> StoreResult<()>;

    // -------------------------------------------------------------------------
    // Returns
    // -------------------------------------------------------------------------

    async fn get_return(&self, id: &str) -> StoreResult<Option<Return>>;

    async fn list_returns(&self) -> StoreResult<Vec<Return>>;

    async fn insert_return(&self, ret: &Return) -> StoreResult<()>;

    /// Guarded status change. `Ok(false)` when the stored status is no
    /// longer `from`.
    async fn transition_return_status(
        &self,
        id: &str,
        from: ReturnStatus,
        to: ReturnStatus,
    ) -> StoreResult<bool>;

    // -------------------------------------------------------------------------
    // Debts
    // -------------------------------------------------------------------------

    async fn get_debt(&self, id: &str) -> StoreResult<Option<Debt>>;

    async fn list_debts_by_sale(&self, sale_id: &str) -> StoreResult<Vec<Debt>>;

    async fn list_debts_by_customer(&self, customer_id: &str) -> StoreResult<Vec<Debt>>;

    async fn insert_debt(&self, debt: &Debt) -> StoreResult<()>;

    /// Appends the payment and updates the debt, only while it is active.
    /// `Ok(None)` when the debt is paid, deleted or missing.
    async fn apply_debt_payment(&self, payment: &DebtPayment) -> StoreResult<Option<Debt>>;

    async fn list_debt_payments(&self, debt_id: &str) -> StoreResult<Vec<DebtPayment>>;

    // -------------------------------------------------------------------------
    // Any entity
    // -------------------------------------------------------------------------

    async fn soft_delete(&self, kind: EntityKind, id: &str) -> StoreResult<SoftDelete>;
}
