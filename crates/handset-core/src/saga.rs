//! # Saga Actions
//!
//! The record store offers no multi-table transaction, so every operation is
//! an explicit list of `{action, compensation}` steps. Each step is attempted
//! on its own; its outcome is recorded instead of aborting siblings.
//!
//! ## Action / Compensation Pairs
//! ```text
//! ┌──────────────────────────────────┬──────────────────────────────────────┐
//! │ Action                           │ Compensation                         │
//! ├──────────────────────────────────┼──────────────────────────────────────┤
//! │ AdjustStock { delta }            │ AdjustStock { -delta }               │
//! │ MarkSold { item }                │ RestoreItem { item }                 │
//! │ RestoreItem { item }             │ MarkSold { item }                    │
//! │ RegisterTradeIn(trade_in)        │ RemoveTradeIn(trade_in)              │
//! │ RemoveTradeIn(trade_in)          │ RegisterTradeIn(trade_in)            │
//! │ ApplyCredit { delta }            │ ApplyCredit { -delta }               │
//! │ SyncDerivedStock                 │ (none: recomputed, not reversed)     │
//! │ SoftDeleteDebt                   │ (none)                               │
//! │ WriteLineItems                   │ (none)                               │
//! └──────────────────────────────────┴──────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::drafts::SaleTotals;
use crate::money::Money;
use crate::types::{ItemCondition, SaleItem};

// =============================================================================
// Trade-In
// =============================================================================

/// The device a customer hands over in a swap, as it is registered in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIn {
    pub imei: String,
    pub swap_number: String,
    pub product_id: Option<String>,
    pub condition: ItemCondition,
}

// =============================================================================
// Action
// =============================================================================

/// One sub-write issued by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Counter change on a plain product, floored at zero by the store.
    AdjustStock { product_id: String, delta: i64 },
    /// Guarded `in_stock -> sold` transition of one unit.
    MarkSold {
        item_id: String,
        imei: String,
        sale_id: Option<String>,
        customer_id: Option<String>,
    },
    /// Guarded `sold -> in_stock` transition, clearing the sale stamps.
    RestoreItem {
        item_id: String,
        imei: String,
        sale_id: Option<String>,
        customer_id: Option<String>,
    },
    /// New in-stock unit for a device handed over in a swap.
    RegisterTradeIn(TradeIn),
    /// Soft delete of the unit a swap registered.
    RemoveTradeIn(TradeIn),
    /// Signed change to a customer's store credit.
    ApplyCredit { customer_id: String, delta_cents: i64 },
    /// Write a tracked product's derived count into its cached counter.
    SyncDerivedStock { product_id: String },
    /// Reversal of a debt opened for a deleted sale.
    SoftDeleteDebt { debt_id: String },
    /// Rewrite a sale's lines and totals once the units actually sold are
    /// known.
    WriteLineItems {
        sale_id: String,
        items: Vec<SaleItem>,
        totals: SaleTotals,
    },
}

impl Action {
    /// The action that undoes this one, if it can be undone.
    pub fn compensation(&self) -> Option<Action> {
        match self {
            Action::AdjustStock { product_id, delta } => Some(Action::AdjustStock {
                product_id: product_id.clone(),
                delta: -delta,
            }),
            Action::MarkSold {
                item_id,
                imei,
                sale_id,
                customer_id,
            } => Some(Action::RestoreItem {
                item_id: item_id.clone(),
                imei: imei.clone(),
                sale_id: sale_id.clone(),
                customer_id: customer_id.clone(),
            }),
            Action::RestoreItem {
                item_id,
                imei,
                sale_id,
                customer_id,
            } => Some(Action::MarkSold {
                item_id: item_id.clone(),
                imei: imei.clone(),
                sale_id: sale_id.clone(),
                customer_id: customer_id.clone(),
            }),
            Action::RegisterTradeIn(trade_in) => Some(Action::RemoveTradeIn(trade_in.clone())),
            Action::RemoveTradeIn(trade_in) => Some(Action::RegisterTradeIn(trade_in.clone())),
            Action::ApplyCredit {
                customer_id,
                delta_cents,
            } => Some(Action::ApplyCredit {
                customer_id: customer_id.clone(),
                delta_cents: -delta_cents,
            }),
            Action::SyncDerivedStock { .. }
            | Action::SoftDeleteDebt { .. }
            | Action::WriteLineItems { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AdjustStock { product_id, delta } => {
                write!(f, "adjust stock of {} by {:+}", product_id, delta)
            }
            Action::MarkSold { imei, .. } => write!(f, "mark {} sold", imei),
            Action::RestoreItem { imei, .. } => write!(f, "restore {} to stock", imei),
            Action::RegisterTradeIn(t) => {
                write!(f, "register trade-in {} from {}", t.imei, t.swap_number)
            }
            Action::RemoveTradeIn(t) => {
                write!(f, "remove trade-in {} from {}", t.imei, t.swap_number)
            }
            Action::ApplyCredit {
                customer_id,
                delta_cents,
            } => write!(
                f,
                "apply credit {} to customer {}",
                Money::from_cents(*delta_cents),
                customer_id
            ),
            Action::SyncDerivedStock { product_id } => {
                write!(f, "sync cached stock of {}", product_id)
            }
            Action::SoftDeleteDebt { debt_id } => write!(f, "reverse debt {}", debt_id),
            Action::WriteLineItems { sale_id, items, .. } => {
                write!(f, "write {} line items of {}", items.len(), sale_id)
            }
        }
    }
}

// =============================================================================
// Steps & Outcomes
// =============================================================================

/// An action paired with its compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaStep {
    pub action: Action,
    pub compensation: Option<Action>,
}

impl SagaStep {
    pub fn new(action: Action) -> Self {
        let compensation = action.compensation();
        SagaStep {
            action,
            compensation,
        }
    }
}

impl From<Action> for SagaStep {
    fn from(action: Action) -> Self {
        SagaStep::new(action)
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    /// The store rejected or failed the write.
    Failed { reason: String },
    /// Deliberately not attempted, or a guarded write found nothing to do.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: SagaStep,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn applied(action: Action) -> Self {
        StepOutcome {
            step: SagaStep::new(action),
            status: StepStatus::Applied,
        }
    }

    pub fn failed(action: Action, reason: impl Into<String>) -> Self {
        StepOutcome {
            step: SagaStep::new(action),
            status: StepStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn skipped(action: Action, reason: impl Into<String>) -> Self {
        StepOutcome {
            step: SagaStep::new(action),
            status: StepStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self.status, StepStatus::Applied)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed { .. })
    }
}
