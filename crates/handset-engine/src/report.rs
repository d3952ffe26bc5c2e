//! # Operation Reports
//!
//! What an orchestrator operation actually did. Sub-writes are best effort,
//! so the caller gets the full ledger of steps instead of a single error.
//!
//! ```text
//! OperationReport { kind: CreateSale, entity_id: "sale-1", noop: false }
//!   steps:
//!     Applied  mark 356938035643809 sold           (comp: restore to stock)
//!     Skipped  mark 356938035643817 sold           "no longer in stock"
//!     Failed   adjust stock of p-cases by -2       "store unavailable: ..."
//!     Applied  write 2 line items of sale-1
//!   shortfalls:
//!     p-a15 requested 2, allocated 1
//! ```

use serde::Serialize;

use handset_core::{Allocation, RejectedRef, StepOutcome};

/// Which orchestrator entry point produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateSale,
    UpdateSale,
    DeleteSale,
    CreateSwap,
    DeleteSwap,
    CreateReturn,
    UpdateReturnStatus,
    DeleteReturn,
}

/// Units asked for on a tracked line but not sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub product_id: String,
    pub requested: i64,
    pub allocated: i64,
    pub rejected: Vec<RejectedRef>,
    /// Allocated units whose mark-sold write did not land.
    pub lost: Vec<String>,
}

impl Shortfall {
    pub fn from_allocation(allocation: &Allocation) -> Self {
        Shortfall {
            product_id: allocation.product_id.clone(),
            requested: allocation.requested,
            allocated: allocation.allocated(),
            rejected: allocation.rejected.clone(),
            lost: Vec::new(),
        }
    }

    #[inline]
    pub fn missing(&self) -> i64 {
        (self.requested - self.allocated).max(0)
    }
}

/// Ordered outcome of every step an operation attempted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    pub kind: OperationKind,
    pub entity_id: String,
    pub steps: Vec<StepOutcome>,
    pub shortfalls: Vec<Shortfall>,
    /// Nothing to do, e.g. deleting an already deleted record.
    pub noop: bool,
}

impl OperationReport {
    pub fn new(kind: OperationKind, entity_id: impl Into<String>) -> Self {
        OperationReport {
            kind,
            entity_id: entity_id.into(),
            steps: Vec::new(),
            shortfalls: Vec::new(),
            noop: false,
        }
    }

    pub fn noop(kind: OperationKind, entity_id: impl Into<String>) -> Self {
        OperationReport {
            noop: true,
            ..OperationReport::new(kind, entity_id)
        }
    }

    pub fn push(&mut self, outcome: StepOutcome) {
        self.steps.push(outcome);
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = StepOutcome>) {
        self.steps.extend(outcomes);
    }

    /// Records a shortfall; complete allocations are ignored.
    pub fn add_shortfall(&mut self, shortfall: Shortfall) {
        if shortfall.missing() > 0 || !shortfall.rejected.is_empty() || !shortfall.lost.is_empty()
        {
            self.shortfalls.push(shortfall);
        }
    }

    /// No failed step and no shortfall.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none() && !self.has_shortfall()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    #[inline]
    pub fn has_shortfall(&self) -> bool {
        !self.shortfalls.is_empty()
    }

    pub fn applied(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.is_applied())
    }
}

/// A stored record and the report of the operation that wrote it.
#[derive(Debug, Clone, Serialize)]
pub struct Recorded<T> {
    pub record: T,
    pub report: OperationReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use handset_core::Action;

    fn adjust(delta: i64) -> Action {
        Action::AdjustStock {
            product_id: "p-1".to_string(),
            delta,
        }
    }

    #[test]
    fn test_failed_step_makes_report_incomplete() {
        let mut report = OperationReport::new(OperationKind::CreateSale, "s-1");
        report.push(StepOutcome::applied(adjust(-1)));
        assert!(report.is_complete());

        report.push(StepOutcome::failed(adjust(-2), "store unavailable"));
        assert!(!report.is_complete());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.applied().count(), 1);
    }

    #[test]
    fn test_full_allocation_is_not_a_shortfall() {
        let mut report = OperationReport::new(OperationKind::CreateSale, "s-1");
        report.add_shortfall(Shortfall::from_allocation(&Allocation::empty("p-1", 0)));
        assert!(!report.has_shortfall());

        report.add_shortfall(Shortfall::from_allocation(&Allocation::empty("p-1", 2)));
        assert!(report.has_shortfall());
        assert_eq!(report.shortfalls[0].missing(), 2);
    }

    #[test]
    fn test_noop_report_serializes_camel_case() {
        let report = OperationReport::noop(OperationKind::DeleteSale, "s-9");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "delete_sale");
        assert_eq!(json["entityId"], "s-9");
        assert_eq!(json["noop"], true);
    }
}
