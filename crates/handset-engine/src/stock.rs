//! # Stock Resolver
//!
//! The single place that answers "how many of this product can be sold".
//!
//! ```text
//! ┌────────────────────────────┐      ┌───────────────────────────────────┐
//! │ CounterBacked(product)     │ ───► │ product.stock                     │
//! └────────────────────────────┘      └───────────────────────────────────┘
//! ┌────────────────────────────┐      ┌───────────────────────────────────┐
//! │ LedgerBacked(product_id)   │ ───► │ count_in_stock(product_id)        │
//! └────────────────────────────┘      │   on failure: stored stock (warn) │
//!                                     └───────────────────────────────────┘
//! ```
//!
//! The stored `stock` of a tracked product is only ever a cached copy, kept
//! fresh by [`StockResolver::sync_cached`] and read back as a fallback.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use handset_core::{Product, StockSource};

use crate::error::{EngineError, EngineResult, StoreResult};
use crate::store::RecordStore;

/// A product at or below its reorder level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStock {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
    pub min_stock: i64,
}

#[derive(Clone)]
pub struct StockResolver {
    store: Arc<dyn RecordStore>,
}

impl StockResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        StockResolver { store }
    }

    /// Sellable quantity of `product`. Never fails: a failed count on a
    /// tracked product degrades to the last stored value.
    pub async fn resolve(&self, product: &Product) -> i64 {
        match product.stock_source() {
            StockSource::CounterBacked(p) => p.stock.max(0),
            StockSource::LedgerBacked(product_id) => {
                match self.store.count_in_stock(product_id).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(
                            product_id,
                            cached = product.stock,
                            error = %e,
                            "In-stock count failed, using stored stock"
                        );
                        product.stock.max(0)
                    }
                }
            }
        }
    }

    pub async fn resolve_by_id(&self, product_id: &str) -> EngineResult<i64> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))?;
        Ok(self.resolve(&product).await)
    }

    /// Resolves several products concurrently, in input order.
    pub async fn resolve_many(&self, products: &[Product]) -> Vec<(String, i64)> {
        let counts = join_all(products.iter().map(|p| self.resolve(p))).await;
        products.iter().map(|p| p.id.clone()).zip(counts).collect()
    }

    /// Products whose resolved stock is at or below `min_stock`.
    pub async fn low_stock(&self, products: &[Product]) -> Vec<LowStock> {
        let counts = join_all(products.iter().map(|p| self.resolve(p))).await;
        products
            .iter()
            .zip(counts)
            .filter(|(p, stock)| *stock <= p.min_stock)
            .map(|(p, stock)| LowStock {
                product_id: p.id.clone(),
                name: p.name.clone(),
                stock,
                min_stock: p.min_stock,
            })
            .collect()
    }

    /// Writes the derived count of a tracked product into its stored counter.
    /// Returns the count written.
    pub async fn sync_cached(&self, product_id: &str) -> StoreResult<i64> {
        let count = self.store.count_in_stock(product_id).await?;
        self.store.set_stock(product_id, count).await?;
        debug!(product_id, count, "Cached stock synced");
        Ok(count)
    }
}
