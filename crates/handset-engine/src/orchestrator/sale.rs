//! Sale create, update and delete.
//!
//! ```text
//! create   allocate ─► insert sale ─► [MarkSold.. AdjustStock(-q).. ApplyCredit(-c)]
//!                                      └─► drop lost units ─► WriteLineItems ─► sync
//! update   shift credit ─► update sale ─► [AdjustStock(+old q)..] ─► [sell new lines]
//!          ─► [ApplyCredit(+old c) ApplyCredit(-new c)] ─► sync
//! delete   claim ─► [RestoreItem.. AdjustStock(+q).. ApplyCredit(+c) SoftDeleteDebt..] ─► sync
//! ```

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use handset_core::drafts::explicit_refs;
use handset_core::notes::{append_note, credit_to_restore, format_credit_note, strip_credit_note};
use handset_core::numbering::DocumentKind;
use handset_core::{
    Action, Allocation, DebtStatus, EntityKind, InventoryItem, InventoryStatus, ItemRef, Money,
    PaymentMethod, Product, Sale, SaleDraft, SaleItem, SaleTotals, SaleUpdate, StepOutcome, TaxRate,
    ValidationError,
};

use super::{next_number, Orchestrator};
use crate::error::{EngineError, EngineResult};
use crate::report::{OperationKind, OperationReport, Recorded, Shortfall};

/// One sale line after allocation.
struct LinePlan {
    line: SaleItem,
    requested: i64,
    /// Units this sale already held before an edit, kept on the line.
    kept: Vec<InventoryItem>,
    /// Newly allocated units. `None` for plain lines.
    allocation: Option<Allocation>,
    /// Allocated units whose mark-sold write did not land.
    lost: Vec<String>,
}

impl LinePlan {
    fn plain(line: SaleItem) -> Self {
        LinePlan {
            requested: line.quantity,
            line,
            kept: Vec::new(),
            allocation: None,
            lost: Vec::new(),
        }
    }

    fn is_tracked(&self) -> bool {
        self.allocation.is_some()
    }
}

impl Orchestrator {
    // =========================================================================
    // Create
    // =========================================================================

    /// Records a sale and takes its goods out of stock.
    ///
    /// Tracked lines end up naming the units actually sold, so a short
    /// allocation or a lost guard shrinks the line and its totals.
    pub async fn create_sale(&self, draft: SaleDraft) -> EngineResult<Recorded<Sale>> {
        let mut draft = draft.validated()?;
        let products = self
            .require_products(draft.items.iter().map(|i| i.product_id.as_str()))
            .await?;
        let holds = draft.status.holds_stock();

        let lines = std::mem::take(&mut draft.items);
        let mut plans = if holds {
            self.plan_lines(lines, &products, &mut Vec::new()).await?
        } else {
            named_lines(lines, &products)
        };

        let explicit_totals = draft.totals;
        draft.items = planned_lines(&plans);
        let totals = draft.totals();
        draft.totals = Some(totals);

        let credit = if holds { draft.credit_to_apply() } else { None };
        let mut notes = draft.notes.clone();
        if let Some(amount) = credit {
            let customer_id = draft
                .customer_id
                .as_deref()
                .ok_or_else(|| ValidationError::required("customer_id"))?;
            self.ledger.ensure_available(customer_id, amount).await?;
            notes = Some(append_note(
                notes.as_deref(),
                &format_credit_note(&self.credit_currency, amount),
            ));
        }

        let now = Utc::now();
        let mut sale = Sale {
            id: Uuid::new_v4().to_string(),
            sale_number: draft
                .sale_number
                .clone()
                .unwrap_or_else(|| next_number(DocumentKind::Sale, now)),
            customer_id: draft.customer_id.clone(),
            cashier_id: draft.cashier_id.clone(),
            items: draft.items.clone(),
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            discount_cents: totals.discount_cents,
            total_cents: totals.total_cents,
            status: draft.status,
            payment_method: draft.payment_method,
            notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_sale(&sale).await?;

        let mut report = OperationReport::new(OperationKind::CreateSale, &sale.id);
        if holds {
            let mut actions = sell_actions(&plans, &sale.id, sale.customer_id.as_deref());
            if let (Some(amount), Some(customer_id)) = (credit, &sale.customer_id) {
                actions.push(Action::ApplyCredit {
                    customer_id: customer_id.clone(),
                    delta_cents: -amount.cents(),
                });
            }

            let outcomes = self.run_batch(actions).await;
            let changed = settle(&mut plans, &outcomes, &mut report);
            report.extend(outcomes);

            if changed {
                let lines = planned_lines(&plans);
                let totals = explicit_totals.unwrap_or_else(|| {
                    SaleTotals::compute(&lines, draft.tax_rate, Money::from_cents(draft.discount_cents))
                });
                self.rewrite_lines(&mut sale, lines, totals, &mut report).await;
            }

            report.extend(self.sync_tracked(products.values()).await);
        }

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            total = sale.total_cents,
            steps = report.steps.len(),
            complete = report.is_complete(),
            "Sale created"
        );
        Ok(Recorded {
            record: sale,
            report,
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Edits a stored sale and moves stock to match.
    ///
    /// Old plain lines go back to stock before the new lines are sold. Units
    /// the sale already holds count toward the new tracked lines; units no
    /// longer on any line stay sold and show up as skipped restore steps.
    /// Store credit follows stock: it is consumed when the sale starts
    /// holding stock and given back when it stops.
    pub async fn update_sale(&self, sale_id: &str, update: SaleUpdate) -> EngineResult<Recorded<Sale>> {
        let update = update.validated()?;
        let stored = self
            .store
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;

        let old_holds = stored.status.holds_stock();
        let status = update.status.unwrap_or(stored.status);
        let new_holds = status.holds_stock();
        let new_items = update.items.clone().filter(|items| *items != stored.items);
        let items_changed = new_items.is_some();

        let restock = old_holds && (items_changed || !new_holds);
        let resell = new_holds && (items_changed || !old_holds);

        let lines = new_items.unwrap_or_else(|| stored.items.clone());
        let products = self
            .fetch_products(
                stored
                    .items
                    .iter()
                    .chain(lines.iter())
                    .map(|i| i.product_id.as_str()),
            )
            .await?;
        if resell {
            if let Some(missing) = lines.iter().find(|l| !products.contains_key(&l.product_id)) {
                return Err(EngineError::not_found("Product", &missing.product_id));
            }
        }

        let mut held: Vec<InventoryItem> = if old_holds && (restock || resell) {
            self.store
                .list_items_by_sale(sale_id)
                .await?
                .into_iter()
                .filter(|unit| unit.status == InventoryStatus::Sold)
                .collect()
        } else {
            Vec::new()
        };

        let mut plans = if resell {
            self.plan_lines(lines, &products, &mut held).await?
        } else {
            named_lines(lines, &products)
        };
        let final_lines = planned_lines(&plans);

        let tax_rate = update.tax_rate.unwrap_or_else(|| effective_tax_rate(&stored));
        let discount = Money::from_cents(stored.discount_cents);
        let totals = update.totals.unwrap_or_else(|| {
            if items_changed || final_lines != stored.items {
                SaleTotals::compute(&final_lines, tax_rate, discount)
            } else {
                stored_totals(&stored)
            }
        });

        let mut sale = Sale {
            items: final_lines,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            discount_cents: totals.discount_cents,
            total_cents: totals.total_cents,
            status,
            customer_id: update.customer_id.clone().or_else(|| stored.customer_id.clone()),
            payment_method: update.payment_method.unwrap_or(stored.payment_method),
            notes: update.notes.clone().or_else(|| stored.notes.clone()),
            updated_at: Utc::now(),
            ..stored.clone()
        };
        let (notes, credit_actions) = self.shift_credit(&stored, &sale).await?;
        sale.notes = notes;
        self.store.update_sale(&sale).await?;

        let mut report = OperationReport::new(OperationKind::UpdateSale, sale_id);

        if restock {
            let mut actions = restock_actions(&stored.items, &products, &mut report);
            if !new_holds {
                actions.extend(held.drain(..).map(|unit| restore_action(unit, sale_id)));
            }
            report.extend(self.run_batch(actions).await);
        }

        if resell {
            let actions = sell_actions(&plans, sale_id, sale.customer_id.as_deref());
            let outcomes = self.run_batch(actions).await;
            let changed = settle(&mut plans, &outcomes, &mut report);
            report.extend(outcomes);

            for unit in held.drain(..) {
                warn!(
                    sale_id,
                    imei = %unit.imei,
                    "Unit dropped from an edited sale stays sold"
                );
                report.push(StepOutcome::skipped(
                    restore_action(unit, sale_id),
                    "units stay sold when a sale's items are edited",
                ));
            }

            if changed {
                let lines = planned_lines(&plans);
                let totals = update
                    .totals
                    .unwrap_or_else(|| SaleTotals::compute(&lines, tax_rate, discount));
                self.rewrite_lines(&mut sale, lines, totals, &mut report).await;
            }
        }

        if !credit_actions.is_empty() {
            report.extend(self.run_batch(credit_actions).await);
        }

        if restock || resell {
            report.extend(self.sync_tracked(products.values()).await);
        }

        info!(
            sale_id,
            status = ?sale.status,
            items_changed,
            steps = report.steps.len(),
            complete = report.is_complete(),
            "Sale updated"
        );
        Ok(Recorded {
            record: sale,
            report,
        })
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Soft-deletes a sale and reverses what creating it did.
    ///
    /// Deleting an already deleted sale is a no-op.
    pub async fn delete_sale(&self, sale_id: &str) -> EngineResult<OperationReport> {
        let stored = self.store.get_sale(sale_id).await?;

        let mut products = HashMap::new();
        let mut units = Vec::new();
        let mut debts = Vec::new();
        if let Some(sale) = &stored {
            if sale.status.holds_stock() {
                products = self
                    .fetch_products(sale.items.iter().map(|i| i.product_id.as_str()))
                    .await?;
                units = self.store.list_items_by_sale(sale_id).await?;
            }
            debts = self.store.list_debts_by_sale(sale_id).await?;
        }

        let Some(sale) = self.claim(EntityKind::Sale, sale_id, stored).await? else {
            info!(sale_id, "Sale already deleted");
            return Ok(OperationReport::noop(OperationKind::DeleteSale, sale_id));
        };

        let mut report = OperationReport::new(OperationKind::DeleteSale, sale_id);
        let mut actions = Vec::new();
        let mut touched: Vec<Product> = products.values().cloned().collect();

        if sale.status.holds_stock() {
            actions.extend(restock_actions(&sale.items, &products, &mut report));

            let sold: Vec<InventoryItem> = units
                .into_iter()
                .filter(|unit| unit.status == InventoryStatus::Sold)
                .collect();
            let extra_ids: HashSet<String> = sold
                .iter()
                .filter_map(|unit| unit.product_id.clone())
                .filter(|id| !products.contains_key(id))
                .collect();
            match self.fetch_products(extra_ids.iter().map(String::as_str)).await {
                Ok(found) => touched.extend(found.into_values()),
                Err(e) => warn!(
                    sale_id,
                    error = %e,
                    products = extra_ids.len(),
                    "Could not load products of restored units, cached stock not synced"
                ),
            }
            actions.extend(sold.into_iter().map(|unit| restore_action(unit, sale_id)));

            match (credit_to_restore(&sale), &sale.customer_id) {
                (Some(amount), Some(customer_id)) => actions.push(Action::ApplyCredit {
                    customer_id: customer_id.clone(),
                    delta_cents: amount.cents(),
                }),
                (Some(amount), None) => warn!(
                    sale_id,
                    amount = amount.cents(),
                    "Sale consumed credit but has no customer, nothing to restore"
                ),
                (None, _) => {}
            }
        }

        actions.extend(
            debts
                .into_iter()
                .filter(|debt| debt.status == DebtStatus::Active)
                .map(|debt| Action::SoftDeleteDebt { debt_id: debt.id }),
        );

        report.extend(self.run_batch(actions).await);
        report.extend(self.sync_tracked(touched.iter()).await);

        info!(
            sale_id,
            steps = report.steps.len(),
            complete = report.is_complete(),
            "Sale deleted"
        );
        Ok(report)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Allocates units for every tracked line.
    ///
    /// `held` holds units already sold to this sale; matching ones are kept
    /// on the line and removed from `held`, leaving the surplus behind.
    async fn plan_lines(
        &self,
        lines: Vec<SaleItem>,
        products: &HashMap<String, Product>,
        held: &mut Vec<InventoryItem>,
    ) -> EngineResult<Vec<LinePlan>> {
        let mut exclude: HashSet<String> = held.iter().map(|unit| unit.id.clone()).collect();
        let mut plans = Vec::with_capacity(lines.len());

        for mut line in lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| EngineError::not_found("Product", &line.product_id))?;
            if line.product_name.is_empty() {
                line.product_name = product.name.clone();
            }
            if !product.is_tracked() {
                plans.push(LinePlan::plain(line));
                continue;
            }

            let requested = line.quantity;
            let refs = explicit_refs(&line);
            let kept = take_held(held, &line.product_id, &refs, requested);
            let open_refs: Vec<ItemRef> = refs
                .iter()
                .filter(|r| !kept.iter().any(|unit| matches_ref(unit, r)))
                .cloned()
                .collect();
            let need = if refs.is_empty() {
                requested - kept.len() as i64
            } else {
                open_refs.len() as i64
            };

            let mut allocation = if need > 0 {
                self.allocator
                    .allocate(&line.product_id, need, &open_refs, &exclude)
                    .await?
            } else {
                Allocation::empty(line.product_id.clone(), 0)
            };
            if !refs.is_empty() && kept.is_empty() {
                allocation = allocation.require_any()?;
            }

            exclude.extend(allocation.item_ids());
            stamp(&mut line, kept.iter().chain(&allocation.items));
            plans.push(LinePlan {
                line,
                requested,
                kept,
                allocation: Some(allocation),
                lost: Vec::new(),
            });
        }

        Ok(plans)
    }

    /// Works out the credit an edit moves and the notes to store with it.
    ///
    /// A sale holding stock carries its consumed credit as a note tag; one
    /// that does not has consumed nothing. Affordability of a new
    /// consumption is checked here, before any write.
    async fn shift_credit(
        &self,
        stored: &Sale,
        edited: &Sale,
    ) -> EngineResult<(Option<String>, Vec<Action>)> {
        let consumed = if stored.status.holds_stock() {
            credit_to_restore(stored)
        } else {
            None
        };
        let owed = if !edited.status.holds_stock() {
            None
        } else if consumed.is_some() {
            consumed
        } else if edited.payment_method == PaymentMethod::Credit {
            Some(edited.total()).filter(Money::is_positive)
        } else {
            None
        };

        let before = consumed.zip(stored.customer_id.clone());
        let after = match (owed, &edited.customer_id) {
            (Some(amount), Some(customer_id)) => Some((amount, customer_id.clone())),
            (Some(_), None) if consumed.is_none() => {
                return Err(ValidationError::required("customer_id").into())
            }
            _ => None,
        };

        let mut notes = strip_credit_note(edited.notes.as_deref());
        if let Some(amount) = owed {
            notes = Some(append_note(
                notes.as_deref(),
                &format_credit_note(&self.credit_currency, amount),
            ));
        }
        if before == after {
            return Ok((notes, Vec::new()));
        }

        if let Some((amount, customer_id)) = &after {
            self.ledger.ensure_available(customer_id, *amount).await?;
        }
        let mut actions = Vec::new();
        if let Some((amount, customer_id)) = before {
            actions.push(Action::ApplyCredit {
                customer_id,
                delta_cents: amount.cents(),
            });
        }
        if let Some((amount, customer_id)) = after {
            actions.push(Action::ApplyCredit {
                customer_id,
                delta_cents: -amount.cents(),
            });
        }
        info!(
            sale_id = %stored.id,
            returned = consumed.map(|m| m.cents()).unwrap_or(0),
            consumed = owed.map(|m| m.cents()).unwrap_or(0),
            "Sale credit shifted"
        );
        Ok((notes, actions))
    }

    async fn rewrite_lines(
        &self,
        sale: &mut Sale,
        lines: Vec<SaleItem>,
        totals: SaleTotals,
        report: &mut OperationReport,
    ) {
        let outcome = self
            .execute(Action::WriteLineItems {
                sale_id: sale.id.clone(),
                items: lines.clone(),
                totals,
            })
            .await;
        if outcome.is_applied() {
            sale.items = lines;
            sale.subtotal_cents = totals.subtotal_cents;
            sale.tax_cents = totals.tax_cents;
            sale.discount_cents = totals.discount_cents;
            sale.total_cents = totals.total_cents;
        }
        report.push(outcome);
    }
}

// =============================================================================
// Line Plans
// =============================================================================

/// Lines stored as given, with product names filled in. Used when the sale
/// does not hold stock.
fn named_lines(lines: Vec<SaleItem>, products: &HashMap<String, Product>) -> Vec<LinePlan> {
    lines
        .into_iter()
        .map(|mut line| {
            if line.product_name.is_empty() {
                if let Some(product) = products.get(&line.product_id) {
                    line.product_name = product.name.clone();
                }
            }
            LinePlan::plain(line)
        })
        .collect()
}

/// Lines to store. Tracked lines that ended up with no unit are dropped.
fn planned_lines(plans: &[LinePlan]) -> Vec<SaleItem> {
    plans
        .iter()
        .filter(|plan| !plan.is_tracked() || plan.line.quantity > 0)
        .map(|plan| plan.line.clone())
        .collect()
}

fn sell_actions(plans: &[LinePlan], sale_id: &str, customer_id: Option<&str>) -> Vec<Action> {
    plans
        .iter()
        .flat_map(|plan| match &plan.allocation {
            None => vec![Action::AdjustStock {
                product_id: plan.line.product_id.clone(),
                delta: -plan.line.quantity,
            }],
            Some(allocation) => allocation
                .items
                .iter()
                .map(|unit| Action::MarkSold {
                    item_id: unit.id.clone(),
                    imei: unit.imei.clone(),
                    sale_id: Some(sale_id.to_string()),
                    customer_id: customer_id.map(str::to_string),
                })
                .collect(),
        })
        .collect()
}

/// Drops units whose mark-sold step did not apply and records shortfalls.
/// Returns whether any line changed.
fn settle(plans: &mut [LinePlan], outcomes: &[StepOutcome], report: &mut OperationReport) -> bool {
    let lost: HashSet<&str> = outcomes
        .iter()
        .filter(|outcome| !outcome.is_applied())
        .filter_map(|outcome| match &outcome.step.action {
            Action::MarkSold { item_id, .. } => Some(item_id.as_str()),
            _ => None,
        })
        .collect();

    let mut changed = false;
    for plan in plans.iter_mut() {
        let Some(allocation) = plan.allocation.as_mut() else {
            continue;
        };

        let (gone, sold): (Vec<InventoryItem>, Vec<InventoryItem>) = allocation
            .items
            .drain(..)
            .partition(|unit| lost.contains(unit.id.as_str()));
        allocation.items = sold;

        if !gone.is_empty() {
            changed = true;
            plan.lost = gone.into_iter().map(|unit| unit.id).collect();
            stamp(&mut plan.line, plan.kept.iter().chain(&allocation.items));
        }

        report.add_shortfall(Shortfall {
            product_id: plan.line.product_id.clone(),
            requested: plan.requested,
            allocated: plan.line.quantity,
            rejected: allocation.rejected.clone(),
            lost: plan.lost.clone(),
        });
    }
    changed
}

/// Units from `held` that stay on a tracked line.
///
/// With explicit refs only the named units are kept; otherwise up to
/// `quantity` units of the product.
fn take_held(
    held: &mut Vec<InventoryItem>,
    product_id: &str,
    refs: &[ItemRef],
    quantity: i64,
) -> Vec<InventoryItem> {
    let mut kept = Vec::new();
    let mut i = 0;
    while i < held.len() {
        let unit = &held[i];
        let wanted = unit.belongs_to(product_id)
            && if refs.is_empty() {
                (kept.len() as i64) < quantity
            } else {
                refs.iter().any(|r| matches_ref(unit, r))
            };
        if wanted {
            kept.push(held.remove(i));
        } else {
            i += 1;
        }
    }
    kept
}

fn matches_ref(unit: &InventoryItem, reference: &ItemRef) -> bool {
    match reference {
        ItemRef::Imei(imei) => unit.imei == *imei,
        ItemRef::ItemId(id) => unit.id == *id,
    }
}

/// Points a line at exactly `units`.
fn stamp<'a>(line: &mut SaleItem, units: impl Iterator<Item = &'a InventoryItem>) {
    let (ids, imeis): (Vec<String>, Vec<String>) =
        units.map(|unit| (unit.id.clone(), unit.imei.clone())).unzip();
    line.quantity = ids.len() as i64;
    line.inventory_item_ids = ids;
    line.imeis = imeis;
}

// =============================================================================
// Reversal
// =============================================================================

/// `+quantity` for every plain line. Lines whose product is gone are
/// reported as skipped; tracked lines are restored unit by unit instead.
fn restock_actions(
    lines: &[SaleItem],
    products: &HashMap<String, Product>,
    report: &mut OperationReport,
) -> Vec<Action> {
    let mut actions = Vec::new();
    for line in lines {
        let action = Action::AdjustStock {
            product_id: line.product_id.clone(),
            delta: line.quantity,
        };
        match products.get(&line.product_id) {
            Some(product) if product.is_tracked() => {}
            Some(_) => actions.push(action),
            None => report.push(StepOutcome::skipped(action, "product no longer exists")),
        }
    }
    actions
}

fn restore_action(unit: InventoryItem, sale_id: &str) -> Action {
    Action::RestoreItem {
        item_id: unit.id,
        imei: unit.imei,
        sale_id: Some(sale_id.to_string()),
        customer_id: unit.customer_id,
    }
}

// =============================================================================
// Totals
// =============================================================================

fn stored_totals(sale: &Sale) -> SaleTotals {
    SaleTotals {
        subtotal_cents: sale.subtotal_cents,
        tax_cents: sale.tax_cents,
        discount_cents: sale.discount_cents,
        total_cents: sale.total_cents,
    }
}

/// Tax rate implied by a stored sale's totals, in whole basis points.
fn effective_tax_rate(sale: &Sale) -> TaxRate {
    let taxable = sale.subtotal_cents - sale.discount_cents;
    if taxable <= 0 || sale.tax_cents <= 0 {
        return TaxRate::zero();
    }
    let bps = (sale.tax_cents * 10_000 + taxable / 2) / taxable;
    TaxRate::from_bps(bps.clamp(0, u32::MAX as i64) as u32)
}
