//! Fixtures shared by the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use handset_core::{
    Customer, CustomerDraft, InventoryItem, InventoryItemDraft, ItemCondition, Money, Product,
    ProductDraft, SaleItem,
};
use handset_db::{Database, DbConfig};
use handset_engine::{InMemoryStore, Orchestrator};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A fresh 15-digit IMEI, unique within the test binary.
pub fn imei() -> String {
    format!("35{:013}", NEXT_SERIAL.fetch_add(1, Ordering::Relaxed))
}

/// Engine over an in-memory store, plus the store for fault injection.
pub fn memory_engine() -> (Orchestrator, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (Orchestrator::new(store.clone()), store)
}

/// Engine over a migrated in-memory SQLite database.
pub async fn sqlite_engine() -> Orchestrator {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Orchestrator::new(Arc::new(db))
}

pub async fn plain_product(engine: &Orchestrator, name: &str, stock: i64) -> Product {
    engine
        .register_product(ProductDraft {
            name: name.to_string(),
            price_cents: 5_000,
            cost_cents: 2_000,
            stock,
            min_stock: 2,
            ..ProductDraft::default()
        })
        .await
        .unwrap()
}

/// A tracked handset with `units` registered in stock.
pub async fn tracked_product(
    engine: &Orchestrator,
    name: &str,
    units: usize,
) -> (Product, Vec<InventoryItem>) {
    let product = engine
        .register_product(ProductDraft {
            name: name.to_string(),
            price_cents: 250_000,
            cost_cents: 200_000,
            min_stock: 1,
            product_model_id: Some(format!("model-{}", name.to_lowercase().replace(' ', "-"))),
            ..ProductDraft::default()
        })
        .await
        .unwrap();

    let mut registered = Vec::with_capacity(units);
    for _ in 0..units {
        registered.push(
            engine
                .register_inventory_item(InventoryItemDraft {
                    product_id: product.id.clone(),
                    imei: imei(),
                    condition: ItemCondition::New,
                    notes: None,
                })
                .await
                .unwrap(),
        );
    }
    (product, registered)
}

pub async fn customer(engine: &Orchestrator, credit_cents: i64) -> Customer {
    engine
        .register_customer(CustomerDraft {
            name: "Fatmata Conteh".to_string(),
            phone: Some("+23276123456".to_string()),
            store_credit_cents: credit_cents,
        })
        .await
        .unwrap()
}

pub fn line(product: &Product, quantity: i64) -> SaleItem {
    SaleItem::new(&product.id, quantity, Money::from_cents(product.price_cents))
}

pub async fn stock(engine: &Orchestrator, product: &Product) -> i64 {
    engine.resolver().resolve_by_id(&product.id).await.unwrap()
}

pub async fn item(engine: &Orchestrator, id: &str) -> InventoryItem {
    engine.store().get_item(id).await.unwrap().unwrap()
}

pub async fn credit(engine: &Orchestrator, customer: &Customer) -> i64 {
    engine.ledger().balance(&customer.id).await.unwrap().cents()
}
