//! # handset-engine: Inventory & Transaction Reconciliation
//!
//! Keeps the sellable quantity of every product consistent while sales,
//! swaps and returns are created, edited and deleted.
//!
//! ## Dual Stock Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  plain product      Product.stock is the count                         │
//! │                     sale: AdjustStock(-q)   delete: AdjustStock(+q)    │
//! │                                                                         │
//! │  tracked product    count of in_stock InventoryItems (one per IMEI)    │
//! │  (product model)    sale: MarkSold(unit)    delete: RestoreItem(unit)  │
//! │                     Product.stock is only a cached copy                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`store`] - The `RecordStore` contract, SQLite and in-memory backends
//! - [`stock`] - Stock resolver and low-stock detection
//! - [`allocator`] - Unit allocation (explicit refs or FIFO)
//! - [`ledger`] - Store credit and debts
//! - [`orchestrator`] - Create/update/delete of sales, swaps and returns
//! - [`report`] - Per-step outcomes of an operation
//! - [`config`] / [`telemetry`] - Configuration and tracing setup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use handset_core::{Money, SaleDraft, SaleItem};
//! use handset_engine::{InMemoryStore, Orchestrator};
//!
//! # async fn demo() -> handset_engine::EngineResult<()> {
//! let engine = Orchestrator::new(Arc::new(InMemoryStore::new()));
//! let draft = SaleDraft::new(vec![SaleItem::new("p-case", 2, Money::from_cents(500))]);
//! let sale = engine.create_sale(draft).await?;
//! assert!(sale.report.is_complete());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod report;
pub mod stock;
pub mod store;
pub mod telemetry;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocator::ItemAllocator;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use ledger::CreditLedger;
pub use orchestrator::Orchestrator;
pub use report::{OperationKind, OperationReport, Recorded, Shortfall};
pub use stock::{LowStock, StockResolver};
pub use store::{Fault, InMemoryStore, RecordStore, SoftDelete};
