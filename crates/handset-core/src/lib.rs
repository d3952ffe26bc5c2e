//! # handset-core: Pure Domain Logic for Handset POS
//!
//! Entities, money, IMEI rules and the pure halves of the reconciliation
//! engine. Nothing in this crate awaits or touches storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Handset POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Front end / CLI (out of this workspace)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ intents: create sale, delete swap ...  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   handset-engine: Orchestrator, Resolver, Allocator, Ledger     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ handset-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │   money   │  │ allocation │  │   saga   │  │   │
//! │  │   │  Product  │  │   Money   │  │   FIFO     │  │  Action  │  │   │
//! │  │   │   Sale    │  │  TaxRate  │  │  ItemRef   │  │  inverse │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └──────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐  │   │
//! │  │   │ validation│  │   notes   │  │ line_items │  │  drafts  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └──────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 handset-db (SQLite record store)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, InventoryItem, Sale, Swap, Return, Debt)
//! - [`money`] - Integer money, parsing of amounts written into notes
//! - [`validation`] - IMEI normalisation and input rules
//! - [`drafts`] - Caller intents (SaleDraft, SwapDraft, ReturnDraft, ...)
//! - [`line_items`] - Lenient JSON codec for persisted SaleItem arrays
//! - [`notes`] - Tags written into free-text notes and read back on undo
//! - [`allocation`] - FIFO and explicit-reference unit selection
//! - [`saga`] - Actions and their compensations
//! - [`numbering`] - Human-readable document numbers
//!
//! ## Example Usage
//!
//! ```rust
//! use handset_core::notes::{format_credit_note, parse_applied_credit};
//! use handset_core::Money;
//!
//! let note = format_credit_note("NLe", Money::from_cents(15000));
//! assert_eq!(note, "Credit: NLe 150.00");
//! assert_eq!(parse_applied_credit(&note), Some(Money::from_cents(15000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod drafts;
pub mod error;
pub mod line_items;
pub mod money;
pub mod notes;
pub mod numbering;
pub mod saga;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{Allocation, ItemRef, RejectReason, RejectedRef};
pub use drafts::{
    CustomerDraft, DebtDraft, InventoryItemDraft, ProductDraft, ReturnDraft, SaleDraft, SaleTotals,
    SaleUpdate, SwapDraft,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use saga::{Action, SagaStep, StepOutcome, StepStatus, TradeIn};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single sale line.
///
/// Catches typos like 1000 instead of 10 before they drain stock.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of lines on one sale or return.
pub const MAX_LINE_ITEMS: usize = 100;

/// Currency label written into credit notes when none is configured.
pub const DEFAULT_CREDIT_CURRENCY: &str = "NLe";

/// Accepted IMEI lengths: IMEI (15) and IMEISV-style (17) serials.
pub const IMEI_LENGTHS: [usize; 2] = [15, 17];
