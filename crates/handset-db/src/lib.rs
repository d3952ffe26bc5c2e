//! # handset-db: SQLite Record Store for Handset POS
//!
//! The persistence layer under the reconciliation engine. SQLite via sqlx,
//! one repository per entity, soft deletes everywhere.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Handset POS Data Flow                              │
//! │                                                                         │
//! │  Orchestrator (handset-engine)                                          │
//! │       │  RecordStore trait                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    handset-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │    │ 001_initial  │  │   │
//! │  │   │ soft_delete   │    │ SaleRepo ...   │    │   _schema    │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (or sqlite::memory: in tests)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use handset_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("handset.db")).await?;
//! let unit = db.inventory().find_by_imei("356938035643809").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::SoftDelete;

pub use repository::customer::CustomerRepository;
pub use repository::debt::DebtRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::swap::SwapRepository;
