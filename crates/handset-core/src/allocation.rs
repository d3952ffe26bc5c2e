//! # Allocation
//!
//! Pure selection of the inventory units that satisfy a tracked sale line.
//! Nothing here changes an item's status; the orchestrator does that, one
//! guarded write per unit.
//!
//! ## Two Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  explicit refs given?                                                   │
//! │     │                                                                   │
//! │     ├── yes ─► check_explicit: each ref must exist, belong to the       │
//! │     │          product and be in stock. Bad refs are rejected, the      │
//! │     │          rest are kept (degraded result). All bad = mismatch.     │
//! │     │                                                                   │
//! │     └── no ──► select_fifo: oldest in-stock units first, by created_at. │
//! │                Fewer than requested = partial result, never invented.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both modes skip units in the caller's exclusion set, which is how one sale
//! with two lines for the same product never allocates a unit twice.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{InventoryItem, InventoryStatus};

// =============================================================================
// Item References
// =============================================================================

/// A caller-supplied reference to one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ItemRef {
    Imei(String),
    ItemId(String),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Imei(imei) => write!(f, "IMEI {}", imei),
            ItemRef::ItemId(id) => write!(f, "item {}", id),
        }
    }
}

/// Why a reference could not be allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// No live unit with that IMEI or id.
    NotFound,
    /// The unit belongs to a different product (or none).
    WrongProduct { actual: Option<String> },
    /// The unit is not in stock.
    Unavailable { status: InventoryStatus },
    /// Named twice, or already taken by an earlier line.
    Duplicate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotFound => f.write_str("not found"),
            RejectReason::WrongProduct { actual: Some(p) } => {
                write!(f, "belongs to product {}", p)
            }
            RejectReason::WrongProduct { actual: None } => f.write_str("not linked to a product"),
            RejectReason::Unavailable { status } => write!(f, "is {}", status),
            RejectReason::Duplicate => f.write_str("already allocated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRef {
    pub reference: ItemRef,
    pub reason: RejectReason,
}

// =============================================================================
// Allocation Result
// =============================================================================

/// Units chosen for one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub product_id: String,
    pub requested: i64,
    pub items: Vec<InventoryItem>,
    pub rejected: Vec<RejectedRef>,
}

impl Allocation {
    pub fn empty(product_id: impl Into<String>, requested: i64) -> Self {
        Allocation {
            product_id: product_id.into(),
            requested,
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }

    #[inline]
    pub fn allocated(&self) -> i64 {
        self.items.len() as i64
    }

    /// Units requested but not allocated.
    #[inline]
    pub fn shortfall(&self) -> i64 {
        (self.requested - self.allocated()).max(0)
    }

    #[inline]
    pub fn is_partial(&self) -> bool {
        self.shortfall() > 0
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn imeis(&self) -> Vec<String> {
        self.items.iter().map(|i| i.imei.clone()).collect()
    }

    /// Turns an explicit allocation where every reference failed into
    /// [`CoreError::AllocationMismatch`].
    pub fn require_any(self) -> CoreResult<Self> {
        if self.items.is_empty() && !self.rejected.is_empty() {
            let reason = self
                .rejected
                .iter()
                .map(|r| format!("{} {}", r.reference, r.reason))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CoreError::AllocationMismatch {
                product_id: self.product_id,
                reason,
            });
        }
        Ok(self)
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Picks up to `quantity` of the oldest available units of `product_id`.
///
/// Candidates may be unsorted and may include units of other products or
/// units that are no longer available; those are ignored. Ties on
/// `created_at` break by id so the choice is deterministic.
pub fn select_fifo(
    product_id: &str,
    quantity: i64,
    candidates: Vec<InventoryItem>,
    exclude: &HashSet<String>,
) -> Allocation {
    let mut eligible: Vec<InventoryItem> = candidates
        .into_iter()
        .filter(|item| {
            item.is_available() && item.belongs_to(product_id) && !exclude.contains(&item.id)
        })
        .collect();

    eligible.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    eligible.truncate(quantity.max(0) as usize);

    Allocation {
        product_id: product_id.to_string(),
        requested: quantity,
        items: eligible,
        rejected: Vec::new(),
    }
}

/// Validates explicitly referenced units.
///
/// `resolved` pairs each reference with the unit it resolved to (`None` when
/// the store had no live unit for it). Order is preserved.
pub fn check_explicit(
    product_id: &str,
    resolved: Vec<(ItemRef, Option<InventoryItem>)>,
    exclude: &HashSet<String>,
) -> Allocation {
    let mut allocation = Allocation::empty(product_id, resolved.len() as i64);
    let mut taken: HashSet<String> = HashSet::new();

    for (reference, item) in resolved {
        let verdict = match item {
            None => Err(RejectReason::NotFound),
            Some(item) if item.deleted_at.is_some() => Err(RejectReason::NotFound),
            Some(item) if !item.belongs_to(product_id) => Err(RejectReason::WrongProduct {
                actual: item.product_id,
            }),
            Some(item) if exclude.contains(&item.id) || taken.contains(&item.id) => {
                Err(RejectReason::Duplicate)
            }
            Some(item) if item.status != InventoryStatus::InStock => {
                Err(RejectReason::Unavailable {
                    status: item.status,
                })
            }
            Some(item) => Ok(item),
        };

        match verdict {
            Ok(item) => {
                taken.insert(item.id.clone());
                allocation.items.push(item);
            }
            Err(reason) => allocation.rejected.push(RejectedRef { reference, reason }),
        }
    }

    allocation
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn unit(id: &str, product: &str, minutes: i64, status: InventoryStatus) -> InventoryItem {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        InventoryItem {
            id: id.to_string(),
            product_id: Some(product.to_string()),
            imei: format!("35000000000{:04}", minutes),
            status,
            condition: Default::default(),
            sale_id: None,
            customer_id: None,
            sold_date: None,
            notes: None,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_fifo_picks_oldest_first() {
        let candidates = vec![
            unit("c", "p", 30, InventoryStatus::InStock),
            unit("a", "p", 10, InventoryStatus::InStock),
            unit("b", "p", 20, InventoryStatus::InStock),
        ];
        let alloc = select_fifo("p", 2, candidates, &HashSet::new());
        assert_eq!(alloc.item_ids(), vec!["a", "b"]);
        assert!(!alloc.is_partial());
    }

    #[test]
    fn test_fifo_partial_never_invents() {
        let candidates = vec![
            unit("a", "p", 10, InventoryStatus::InStock),
            unit("b", "p", 20, InventoryStatus::Sold),
            unit("c", "other", 5, InventoryStatus::InStock),
            unit("d", "p", 15, InventoryStatus::InStock),
        ];
        let alloc = select_fifo("p", 3, candidates, &HashSet::new());
        assert_eq!(alloc.item_ids(), vec!["a", "d"]);
        assert_eq!(alloc.allocated(), 2);
        assert_eq!(alloc.shortfall(), 1);
    }

    #[test]
    fn test_fifo_honours_exclusions() {
        let candidates = vec![
            unit("a", "p", 10, InventoryStatus::InStock),
            unit("b", "p", 20, InventoryStatus::InStock),
        ];
        let exclude: HashSet<String> = ["a".to_string()].into_iter().collect();
        let alloc = select_fifo("p", 2, candidates, &exclude);
        assert_eq!(alloc.item_ids(), vec!["b"]);
    }

    #[test]
    fn test_fifo_ties_break_by_id() {
        let candidates = vec![
            unit("b", "p", 10, InventoryStatus::InStock),
            unit("a", "p", 10, InventoryStatus::InStock),
        ];
        let alloc = select_fifo("p", 1, candidates, &HashSet::new());
        assert_eq!(alloc.item_ids(), vec!["a"]);
    }

    #[test]
    fn test_explicit_degrades_to_valid_subset() {
        let resolved = vec![
            (ItemRef::Imei("1".into()), Some(unit("a", "p", 1, InventoryStatus::InStock))),
            (ItemRef::Imei("2".into()), Some(unit("b", "other", 2, InventoryStatus::InStock))),
            (ItemRef::Imei("3".into()), Some(unit("c", "p", 3, InventoryStatus::Sold))),
            (ItemRef::Imei("4".into()), None),
            (ItemRef::ItemId("a".into()), Some(unit("a", "p", 1, InventoryStatus::InStock))),
        ];
        let alloc = check_explicit("p", resolved, &HashSet::new());

        assert_eq!(alloc.item_ids(), vec!["a"]);
        assert_eq!(alloc.requested, 5);
        let reasons: Vec<_> = alloc.rejected.iter().map(|r| r.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::WrongProduct {
                    actual: Some("other".into())
                },
                RejectReason::Unavailable {
                    status: InventoryStatus::Sold
                },
                RejectReason::NotFound,
                RejectReason::Duplicate,
            ]
        );
        assert!(alloc.require_any().is_ok());
    }

    #[test]
    fn test_explicit_all_bad_is_mismatch() {
        let resolved = vec![(
            ItemRef::Imei("123456789012345".into()),
            Some(unit("x", "other", 1, InventoryStatus::InStock)),
        )];
        let err = check_explicit("p", resolved, &HashSet::new())
            .require_any()
            .unwrap_err();
        assert!(matches!(err, CoreError::AllocationMismatch { ref product_id, .. } if product_id == "p"));
        assert!(err.to_string().contains("IMEI 123456789012345 belongs to product other"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn pool() -> impl Strategy<Value = Vec<InventoryItem>> {
            prop::collection::vec((0..3usize, 0..120i64, 0..4usize), 0..25).prop_map(|specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(n, (product, minutes, status))| {
                        let status = [
                            InventoryStatus::InStock,
                            InventoryStatus::Sold,
                            InventoryStatus::Returned,
                            InventoryStatus::Defective,
                        ][status];
                        unit(&format!("u{:02}", n), &format!("p{}", product), minutes, status)
                    })
                    .collect()
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// FIFO never over-allocates, never repeats a unit and only
            /// hands out in-stock units of the requested product.
            #[test]
            fn fifo_allocation_is_bounded_and_distinct(items in pool(), qty in 0..10i64) {
                let available = items
                    .iter()
                    .filter(|i| i.is_available() && i.belongs_to("p0"))
                    .count() as i64;

                let alloc = select_fifo("p0", qty, items, &HashSet::new());

                prop_assert_eq!(alloc.allocated(), qty.min(available));
                prop_assert_eq!(alloc.shortfall(), (qty - available).max(0));

                let ids: HashSet<_> = alloc.item_ids().into_iter().collect();
                prop_assert_eq!(ids.len() as i64, alloc.allocated());
                prop_assert!(alloc.items.iter().all(|i| i.is_available() && i.belongs_to("p0")));
                prop_assert!(alloc.items.windows(2).all(|w| w[0].created_at <= w[1].created_at));
            }

            /// Two consecutive lines sharing an exclusion set never overlap.
            #[test]
            fn consecutive_lines_never_share_units(items in pool(), a in 0..6i64, b in 0..6i64) {
                let mut taken = HashSet::new();
                let first = select_fifo("p1", a, items.clone(), &taken);
                taken.extend(first.item_ids());
                let second = select_fifo("p1", b, items, &taken);

                prop_assert!(second.item_ids().iter().all(|id| !first.item_ids().contains(id)));
            }
        }
    }
}
