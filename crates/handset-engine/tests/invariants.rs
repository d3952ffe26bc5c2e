//! Properties that hold after any sequence of sales and swaps.

mod common;

use std::collections::{HashMap, HashSet};

use common::*;
use handset_core::{Action, InventoryStatus, ItemCondition, Product, SaleDraft, SwapDraft, SwapStatus};
use handset_engine::{InMemoryStore, Orchestrator};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    /// Sell `qty` of product `p` (tracked 0..2, plain 2).
    Sell { p: usize, qty: i64 },
    /// Delete the n-th recorded sale, modulo the count.
    DeleteSale(usize),
    /// Swap one unit of tracked product `p` for a trade-in registered under
    /// tracked product `into`.
    Swap { p: usize, into: usize },
    DeleteSwap(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..3, 1i64..4).prop_map(|(p, qty)| Op::Sell { p, qty }),
        2 => any::<usize>().prop_map(Op::DeleteSale),
        2 => (0usize..2, 0usize..2).prop_map(|(p, into)| Op::Swap { p, into }),
        1 => any::<usize>().prop_map(Op::DeleteSwap),
    ]
}

struct Shop {
    engine: Orchestrator,
    store: std::sync::Arc<InMemoryStore>,
    products: Vec<Product>,
    initial: HashMap<String, i64>,
}

async fn shop() -> Shop {
    let (engine, store) = memory_engine();
    let (a, _) = tracked_product(&engine, "Galaxy A15", 3).await;
    let (b, _) = tracked_product(&engine, "Redmi Note 13", 2).await;
    let cases = plain_product(&engine, "Silicone Case", 1_000).await;

    let products = vec![a, b, cases];
    let mut initial = HashMap::new();
    for product in &products {
        initial.insert(product.id.clone(), stock(&engine, product).await);
    }
    Shop {
        engine,
        store,
        products,
        initial,
    }
}

/// Tracked stock equals the live in-stock units, the cached counter agrees,
/// live IMEIs are unique, and no live unit is held by a deleted sale.
async fn check_consistency(shop: &Shop) {
    let units = shop.store.live_items().await;

    let imeis: HashSet<&str> = units.iter().map(|u| u.imei.as_str()).collect();
    assert_eq!(imeis.len(), units.len(), "duplicate live IMEI");

    for product in shop.products.iter().filter(|p| p.is_tracked()) {
        let in_stock = units
            .iter()
            .filter(|u| u.belongs_to(&product.id) && u.status == InventoryStatus::InStock)
            .count() as i64;
        assert_eq!(stock(&shop.engine, product).await, in_stock);

        let cached = shop.engine.store().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(cached.stock, in_stock);
    }

    let live_sales: HashSet<String> = shop
        .engine
        .store()
        .list_sales()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    for unit in units.iter().filter(|u| u.status == InventoryStatus::Sold) {
        if let Some(sale_id) = &unit.sale_id {
            assert!(live_sales.contains(sale_id), "unit {} held by deleted sale", unit.imei);
        }
    }
}

/// Deletes a swap, counting its trade-in under `kept` when it was not removed.
async fn delete_swap(shop: &Shop, id: &str, into: String, kept: &mut HashMap<String, i64>) {
    let report = shop.engine.delete_swap(id).await.unwrap();
    assert_eq!(report.failures().count(), 0);

    let removed = report
        .steps
        .iter()
        .any(|s| matches!(s.step.action, Action::RemoveTradeIn(_)) && s.is_applied());
    if !removed {
        *kept.entry(into).or_default() += 1;
    }
}

async fn apply(shop: &Shop, ops: Vec<Op>) {
    let mut sales: Vec<String> = Vec::new();
    let mut swaps: Vec<(String, String)> = Vec::new();
    // trade-ins already sold on when their swap was deleted stay in stock
    let mut kept: HashMap<String, i64> = HashMap::new();

    for op in ops {
        match op {
            Op::Sell { p, qty } => {
                let product = &shop.products[p];
                let available = stock(&shop.engine, product).await;
                if product.is_tracked() && available == 0 {
                    continue;
                }
                let sale = shop
                    .engine
                    .create_sale(SaleDraft::new(vec![line(product, qty)]))
                    .await
                    .unwrap();
                if product.is_tracked() {
                    assert_eq!(sale.record.items[0].quantity, qty.min(available));
                }
                sales.push(sale.record.id);
            }
            Op::DeleteSale(n) if !sales.is_empty() => {
                let id = sales.remove(n % sales.len());
                let report = shop.engine.delete_sale(&id).await.unwrap();
                assert!(report.is_complete());
            }
            Op::Swap { p, into } => {
                let draft = SwapDraft {
                    purchased_product_id: shop.products[p].id.clone(),
                    trade_in_product_id: Some(shop.products[into].id.clone()),
                    trade_in_imei: imei(),
                    trade_in_condition: ItemCondition::Used,
                    trade_in_value_cents: 100_000,
                    difference_paid_cents: 150_000,
                    status: SwapStatus::Completed,
                    ..SwapDraft::default()
                };
                let swap = shop.engine.create_swap(draft).await.unwrap();
                swaps.push((swap.record.id, shop.products[into].id.clone()));
            }
            Op::DeleteSwap(n) if !swaps.is_empty() => {
                let (id, into) = swaps.remove(n % swaps.len());
                delete_swap(shop, &id, into, &mut kept).await;
            }
            _ => {}
        }
        check_consistency(shop).await;
    }

    // unwinding sales first frees any resold trade-ins for removal
    for id in sales {
        shop.engine.delete_sale(&id).await.unwrap();
    }
    for (id, into) in swaps {
        delete_swap(shop, &id, into, &mut kept).await;
    }
    check_consistency(shop).await;

    for product in &shop.products {
        assert_eq!(
            stock(&shop.engine, product).await,
            shop.initial[&product.id] + kept.get(&product.id).copied().unwrap_or(0),
            "{} did not return to its starting stock",
            product.name
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Property: stock stays consistent after every step, and deleting every
    /// sale and swap returns each product to its starting quantity plus any
    /// trade-ins that outlived their swap.
    #[test]
    fn stock_is_conserved(ops in prop::collection::vec(op(), 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let shop = shop().await;
            apply(&shop, ops).await;
        });
    }
}
