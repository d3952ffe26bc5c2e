//! Swap (trade-in) create and delete.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use handset_core::numbering::DocumentKind;
use handset_core::{Action, EntityKind, Swap, SwapDraft, SwapStatus, TradeIn, ValidationError};

use super::{next_number, Orchestrator};
use crate::error::{EngineError, EngineResult};
use crate::report::{OperationKind, OperationReport, Recorded, Shortfall};

impl Orchestrator {
    /// Records a swap: the purchased device leaves stock like a one-unit
    /// sale and the handed-over device is registered as a new unit.
    ///
    /// Both effects only happen for a completed swap.
    pub async fn create_swap(&self, draft: SwapDraft) -> EngineResult<Recorded<Swap>> {
        let draft = draft.validated()?;
        let mut ids = vec![draft.purchased_product_id.as_str()];
        ids.extend(draft.trade_in_product_id.as_deref());
        let products = self.require_products(ids.iter().copied()).await?;
        let purchased = products
            .get(&draft.purchased_product_id)
            .ok_or_else(|| EngineError::not_found("Product", &draft.purchased_product_id))?;

        if self
            .store
            .find_item_by_imei(&draft.trade_in_imei)
            .await?
            .is_some()
        {
            return Err(ValidationError::duplicate("trade_in_imei", &draft.trade_in_imei).into());
        }

        let completed = draft.status == SwapStatus::Completed;
        let allocation = if completed && purchased.is_tracked() {
            let refs: Vec<_> = draft.purchased_ref().into_iter().collect();
            let allocation = self
                .allocator
                .allocate(&purchased.id, 1, &refs, &HashSet::new())
                .await?;
            Some(if refs.is_empty() {
                allocation
            } else {
                allocation.require_any()?
            })
        } else {
            None
        };
        let unit = allocation.as_ref().and_then(|a| a.items.first().cloned());

        let now = Utc::now();
        let mut swap = Swap {
            id: Uuid::new_v4().to_string(),
            swap_number: draft
                .swap_number
                .clone()
                .unwrap_or_else(|| next_number(DocumentKind::Swap, now)),
            customer_id: draft.customer_id.clone(),
            purchased_product_id: draft.purchased_product_id.clone(),
            purchased_imei: unit
                .as_ref()
                .map(|u| u.imei.clone())
                .or_else(|| draft.purchased_imei.clone()),
            inventory_item_id: unit.as_ref().map(|u| u.id.clone()),
            trade_in_product_id: draft.trade_in_product_id.clone(),
            trade_in_imei: draft.trade_in_imei.clone(),
            trade_in_condition: draft.trade_in_condition,
            trade_in_value_cents: draft.trade_in_value_cents,
            difference_paid_cents: draft.difference_paid_cents,
            status: draft.status,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_swap(&swap).await?;

        let mut report = OperationReport::new(OperationKind::CreateSwap, &swap.id);
        if !completed {
            return Ok(Recorded {
                record: swap,
                report,
            });
        }

        let mut actions = Vec::new();
        match &unit {
            Some(unit) => actions.push(Action::MarkSold {
                item_id: unit.id.clone(),
                imei: unit.imei.clone(),
                sale_id: None,
                customer_id: swap.customer_id.clone(),
            }),
            None if purchased.is_tracked() => {}
            None => actions.push(Action::AdjustStock {
                product_id: purchased.id.clone(),
                delta: -1,
            }),
        }
        actions.push(Action::RegisterTradeIn(TradeIn {
            imei: swap.trade_in_imei.clone(),
            swap_number: swap.swap_number.clone(),
            product_id: swap.trade_in_product_id.clone(),
            condition: swap.trade_in_condition,
        }));

        let outcomes = self.run_batch(actions).await;
        let lost = outcomes
            .iter()
            .any(|o| matches!(o.step.action, Action::MarkSold { .. }) && !o.is_applied());
        report.extend(outcomes);

        if let Some(allocation) = &allocation {
            let mut shortfall = Shortfall::from_allocation(allocation);
            if lost {
                shortfall.allocated = 0;
                shortfall.lost = allocation.item_ids();
            }
            report.add_shortfall(shortfall);
        }

        if lost {
            warn!(swap_id = %swap.id, "Purchased unit was sold elsewhere, clearing it from the swap");
            swap.inventory_item_id = None;
            swap.purchased_imei = None;
            if let Err(e) = self.store.update_swap(&swap).await {
                warn!(swap_id = %swap.id, error = %e, "Failed to clear lost unit from swap");
            }
        }

        report.extend(self.sync_tracked(products.values()).await);

        info!(
            swap_id = %swap.id,
            swap_number = %swap.swap_number,
            trade_in_imei = %swap.trade_in_imei,
            complete = report.is_complete(),
            "Swap created"
        );
        Ok(Recorded {
            record: swap,
            report,
        })
    }

    /// Soft-deletes a swap, puts the purchased device back and removes the
    /// trade-in unit it registered.
    ///
    /// The trade-in unit is only removed while its notes carry this swap's
    /// tag and it is still in stock.
    pub async fn delete_swap(&self, swap_id: &str) -> EngineResult<OperationReport> {
        let stored = self.store.get_swap(swap_id).await?;
        let products = match &stored {
            Some(swap) => {
                let mut ids = vec![swap.purchased_product_id.as_str()];
                ids.extend(swap.trade_in_product_id.as_deref());
                self.fetch_products(ids).await?
            }
            None => Default::default(),
        };

        let Some(swap) = self.claim(EntityKind::Swap, swap_id, stored).await? else {
            info!(swap_id, "Swap already deleted");
            return Ok(OperationReport::noop(OperationKind::DeleteSwap, swap_id));
        };

        let mut report = OperationReport::new(OperationKind::DeleteSwap, swap_id);
        if swap.status != SwapStatus::Completed {
            return Ok(report);
        }

        let mut actions = Vec::new();
        match (&swap.inventory_item_id, products.get(&swap.purchased_product_id)) {
            (Some(item_id), _) => actions.push(Action::RestoreItem {
                item_id: item_id.clone(),
                imei: swap.purchased_imei.clone().unwrap_or_default(),
                sale_id: None,
                customer_id: swap.customer_id.clone(),
            }),
            (None, Some(product)) if product.is_tracked() => {}
            (None, _) => actions.push(Action::AdjustStock {
                product_id: swap.purchased_product_id.clone(),
                delta: 1,
            }),
        }
        actions.push(Action::RemoveTradeIn(TradeIn {
            imei: swap.trade_in_imei.clone(),
            swap_number: swap.swap_number.clone(),
            product_id: swap.trade_in_product_id.clone(),
            condition: swap.trade_in_condition,
        }));

        report.extend(self.run_batch(actions).await);
        report.extend(self.sync_tracked(products.values()).await);

        info!(swap_id, complete = report.is_complete(), "Swap deleted");
        Ok(report)
    }
}
