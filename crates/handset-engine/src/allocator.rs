//! # Item Allocator
//!
//! Chooses which physical units satisfy a quantity on a tracked product.
//! Selection only; nothing is written. The orchestrator marks the chosen
//! units sold afterwards, and each of those writes can still lose a race.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use handset_core::allocation::{check_explicit, select_fifo};
use handset_core::{Allocation, InventoryItem, ItemRef};

use crate::error::EngineResult;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct ItemAllocator {
    store: Arc<dyn RecordStore>,
}

impl ItemAllocator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        ItemAllocator { store }
    }

    /// Allocates up to `quantity` units of `product_id`.
    ///
    /// With `refs`, exactly those units are checked and `quantity` is
    /// ignored. Without, the oldest in-stock units are taken. Units in
    /// `exclude` are never chosen.
    pub async fn allocate(
        &self,
        product_id: &str,
        quantity: i64,
        refs: &[ItemRef],
        exclude: &HashSet<String>,
    ) -> EngineResult<Allocation> {
        let allocation = if refs.is_empty() {
            let candidates = self.store.list_in_stock(product_id).await?;
            select_fifo(product_id, quantity, candidates, exclude)
        } else {
            let resolved = self.resolve_refs(refs).await?;
            check_explicit(product_id, resolved, exclude)
        };

        if allocation.is_partial() || !allocation.rejected.is_empty() {
            warn!(
                product_id,
                requested = allocation.requested,
                allocated = allocation.allocated(),
                rejected = allocation.rejected.len(),
                "Partial allocation"
            );
        } else {
            debug!(product_id, allocated = allocation.allocated(), "Allocated units");
        }
        Ok(allocation)
    }

    async fn resolve_refs(
        &self,
        refs: &[ItemRef],
    ) -> EngineResult<Vec<(ItemRef, Option<InventoryItem>)>> {
        let lookups = refs.iter().map(|reference| async move {
            let item = match reference {
                ItemRef::Imei(imei) => self.store.find_item_by_imei(imei).await,
                ItemRef::ItemId(id) => self.store.get_item(id).await,
            };
            item.map(|item| (reference.clone(), item))
        });

        join_all(lookups)
            .await
            .into_iter()
            .map(|r| r.map_err(Into::into))
            .collect()
    }
}
