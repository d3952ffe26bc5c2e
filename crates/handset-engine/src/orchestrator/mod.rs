//! # Transaction Orchestrator
//!
//! Turns caller intents (sales, swaps, returns, debts) into a stored record
//! plus the side effects that keep stock and credit consistent.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  proposed ── validate, load, allocate (no writes; errors abort here)   │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  parent write ── insert / update / soft delete of the record itself    │
//! │     │            (a failure here is an EngineError)                    │
//! │     ▼                                                                   │
//! │  applied ── one concurrent batch of sub-writes (Action)                │
//! │     │       each attempted on its own, outcome recorded per step       │
//! │     ▼                                                                   │
//! │  settle ── drop units whose mark-sold guard lost, rewrite lines,       │
//! │            sync cached stock of tracked products                       │
//! │                                                                         │
//! │  Deleting runs the same pipeline with the compensating actions.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sub-write failures never raise. They come back as `StepStatus::Failed`
//! entries in the [`OperationReport`](crate::report::OperationReport), and
//! nothing is retried.

mod catalog;
mod debt;
mod returns;
mod sale;
mod swap;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use handset_core::notes::{is_trade_in_from, trade_in_tag};
use handset_core::numbering::{document_number, DocumentKind};
use handset_core::{
    Action, EntityKind, InventoryItem, InventoryStatus, Product, StepOutcome, TradeIn,
};

use crate::allocator::ItemAllocator;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, StoreResult};
use crate::ledger::CreditLedger;
use crate::stock::StockResolver;
use crate::store::{RecordStore, SoftDelete};

/// How a single action ended when it did not fail.
enum Effect {
    Applied,
    Skipped(String),
}

/// Reconciliation engine over one record store.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    resolver: StockResolver,
    allocator: ItemAllocator,
    ledger: CreditLedger,
    credit_currency: String,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Orchestrator {
            resolver: StockResolver::new(store.clone()),
            allocator: ItemAllocator::new(store.clone()),
            ledger: CreditLedger::new(store.clone()),
            store,
            credit_currency: handset_core::DEFAULT_CREDIT_CURRENCY.to_string(),
        }
    }

    pub fn from_config(store: Arc<dyn RecordStore>, config: &EngineConfig) -> Self {
        Self::new(store).with_credit_currency(config.ledger.currency.clone())
    }

    /// Currency label written into credit notes.
    pub fn with_credit_currency(mut self, currency: impl Into<String>) -> Self {
        self.credit_currency = currency.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn resolver(&self) -> &StockResolver {
        &self.resolver
    }

    pub fn allocator(&self) -> &ItemAllocator {
        &self.allocator
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn credit_currency(&self) -> &str {
        &self.credit_currency
    }

    // =========================================================================
    // Step Execution
    // =========================================================================

    /// Attempts one action and records how it ended. Never fails.
    pub async fn execute(&self, action: Action) -> StepOutcome {
        match self.perform(&action).await {
            Ok(Effect::Applied) => {
                debug!(step = %action, "Step applied");
                StepOutcome::applied(action)
            }
            Ok(Effect::Skipped(reason)) => {
                warn!(step = %action, %reason, "Step skipped");
                StepOutcome::skipped(action, reason)
            }
            Err(e) => {
                warn!(step = %action, error = %e, "Step failed");
                StepOutcome::failed(action, e.to_string())
            }
        }
    }

    /// Issues all actions concurrently. Outcomes come back in input order.
    pub async fn run_batch(&self, actions: Vec<Action>) -> Vec<StepOutcome> {
        join_all(actions.into_iter().map(|action| self.execute(action))).await
    }

    async fn perform(&self, action: &Action) -> StoreResult<Effect> {
        match action {
            Action::AdjustStock { product_id, delta } => {
                let stock = self.store.adjust_stock(product_id, *delta).await?;
                debug!(product_id = %product_id, delta, stock, "Stock adjusted");
                Ok(Effect::Applied)
            }

            Action::MarkSold {
                item_id,
                sale_id,
                customer_id,
                ..
            } => {
                let sold = self
                    .store
                    .mark_sold(item_id, sale_id.as_deref(), customer_id.as_deref(), Utc::now())
                    .await?;
                Ok(guarded(sold, "no longer in stock"))
            }

            Action::RestoreItem {
                item_id, sale_id, ..
            } => {
                if sale_id.is_none() {
                    // Units sold by a swap carry no sale id; never pull back a
                    // unit that has since been sold by a sale.
                    if let Some(owner) = self
                        .store
                        .get_item(item_id)
                        .await?
                        .and_then(|unit| unit.sale_id)
                    {
                        return Ok(Effect::Skipped(format!("sold by sale {}", owner)));
                    }
                }
                let restored = self.store.restore_item(item_id, sale_id.as_deref()).await?;
                Ok(guarded(restored, "not sold by this transaction"))
            }

            Action::RegisterTradeIn(trade_in) => {
                let unit = trade_in_unit(trade_in, Utc::now());
                self.store.insert_item(&unit).await?;
                debug!(imei = %trade_in.imei, swap = %trade_in.swap_number, "Trade-in registered");
                Ok(Effect::Applied)
            }

            Action::RemoveTradeIn(trade_in) => self.remove_trade_in(trade_in).await,

            Action::ApplyCredit {
                customer_id,
                delta_cents,
            } => {
                self.ledger
                    .apply_credit(customer_id, handset_core::Money::from_cents(*delta_cents))
                    .await?;
                Ok(Effect::Applied)
            }

            Action::SyncDerivedStock { product_id } => {
                self.resolver.sync_cached(product_id).await?;
                Ok(Effect::Applied)
            }

            Action::SoftDeleteDebt { debt_id } => {
                match self.store.soft_delete(EntityKind::Debt, debt_id).await? {
                    SoftDelete::Deleted => Ok(Effect::Applied),
                    SoftDelete::AlreadyDeleted => Ok(Effect::Skipped("already deleted".into())),
                    SoftDelete::Missing => Ok(Effect::Skipped("debt not found".into())),
                }
            }

            Action::WriteLineItems {
                sale_id,
                items,
                totals,
            } => {
                self.store.update_sale_lines(sale_id, items, *totals).await?;
                Ok(Effect::Applied)
            }
        }
    }

    async fn remove_trade_in(&self, trade_in: &TradeIn) -> StoreResult<Effect> {
        let Some(unit) = self.store.find_item_by_imei(&trade_in.imei).await? else {
            return Ok(Effect::Skipped("trade-in unit not found".into()));
        };

        let tagged = unit
            .notes
            .as_deref()
            .is_some_and(|notes| is_trade_in_from(notes, &trade_in.swap_number));
        if !tagged {
            return Ok(Effect::Skipped(format!(
                "unit was not registered by {}",
                trade_in.swap_number
            )));
        }
        if unit.status != InventoryStatus::InStock {
            return Ok(Effect::Skipped(format!("trade-in unit is {}", unit.status)));
        }

        match self
            .store
            .soft_delete(EntityKind::InventoryItem, &unit.id)
            .await?
        {
            SoftDelete::Deleted => Ok(Effect::Applied),
            _ => Ok(Effect::Skipped("trade-in unit already removed".into())),
        }
    }

    // =========================================================================
    // Shared Helpers
    // =========================================================================

    /// Soft-deletes a record read earlier. `Ok(None)` when another caller got
    /// there first; the record's effects were already reversed.
    async fn claim<T>(&self, kind: EntityKind, id: &str, record: Option<T>) -> EngineResult<Option<T>> {
        match (record, self.store.soft_delete(kind, id).await?) {
            (Some(record), SoftDelete::Deleted) => Ok(Some(record)),
            (_, SoftDelete::Missing) => Err(EngineError::not_found(kind.to_string(), id)),
            _ => {
                debug!(%kind, id, "Already deleted");
                Ok(None)
            }
        }
    }

    /// Live products among `ids`, fetched concurrently. Missing ids are left
    /// out.
    async fn fetch_products<'a, I>(&self, ids: I) -> EngineResult<HashMap<String, Product>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut unique: Vec<&str> = ids.into_iter().collect();
        unique.sort_unstable();
        unique.dedup();

        let found = join_all(unique.iter().map(|id| self.store.get_product(id))).await;
        let mut products = HashMap::with_capacity(unique.len());
        for product in found {
            if let Some(product) = product? {
                products.insert(product.id.clone(), product);
            }
        }
        Ok(products)
    }

    /// Like [`fetch_products`](Self::fetch_products), but every id must exist.
    async fn require_products<'a, I>(&self, ids: I) -> EngineResult<HashMap<String, Product>>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let products = self.fetch_products(ids.clone()).await?;
        match ids.into_iter().find(|id| !products.contains_key(*id)) {
            Some(missing) => Err(EngineError::not_found("Product", missing)),
            None => Ok(products),
        }
    }

    /// Cached-stock refresh for every tracked product among `products`.
    async fn sync_tracked<'a, I>(&self, products: I) -> Vec<StepOutcome>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        let mut ids: Vec<String> = products
            .into_iter()
            .filter(|p| p.is_tracked())
            .map(|p| p.id.clone())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        self.run_batch(
            ids.into_iter()
                .map(|product_id| Action::SyncDerivedStock { product_id })
                .collect(),
        )
        .await
    }
}

fn guarded(applied: bool, reason: &str) -> Effect {
    if applied {
        Effect::Applied
    } else {
        Effect::Skipped(reason.to_string())
    }
}

fn trade_in_unit(trade_in: &TradeIn, now: DateTime<Utc>) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4().to_string(),
        product_id: trade_in.product_id.clone(),
        imei: trade_in.imei.clone(),
        status: InventoryStatus::InStock,
        condition: trade_in.condition,
        sale_id: None,
        customer_id: None,
        sold_date: None,
        notes: Some(trade_in_tag(&trade_in.swap_number)),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

/// Document number for a record created at `at`.
fn next_number(kind: DocumentKind, at: DateTime<Utc>) -> String {
    let suffix = (Uuid::new_v4().as_u128() % 10_000) as u32;
    document_number(kind, at, suffix)
}
