//! Sale create/update/delete against both record stores.

mod common;

use common::*;
use handset_core::{
    Action, InventoryStatus, SaleDraft, SaleStatus, SaleUpdate, StepStatus,
};
use handset_engine::{EngineError, Orchestrator};

/// Runs a scenario once per backend.
macro_rules! on_both_stores {
    ($memory:ident, $sqlite:ident, $scenario:ident) => {
        #[tokio::test]
        async fn $memory() {
            let (engine, _store) = memory_engine();
            $scenario(engine).await;
        }

        #[tokio::test]
        async fn $sqlite() {
            $scenario(sqlite_engine().await).await;
        }
    };
}

// =============================================================================
// Create and delete
// =============================================================================

async fn sell_then_delete_restores_units(engine: Orchestrator) {
    let (phone, units) = tracked_product(&engine, "Galaxy A15", 5).await;
    assert_eq!(stock(&engine, &phone).await, 5);

    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&phone, 2)]))
        .await
        .unwrap();
    assert!(sale.report.is_complete());
    assert_eq!(stock(&engine, &phone).await, 3);

    let sold_line = &sale.record.items[0];
    assert_eq!(sold_line.quantity, 2);
    assert_eq!(sold_line.inventory_item_ids.len(), 2);
    assert_eq!(sold_line.imeis.len(), 2);
    assert_eq!(sale.record.total_cents, 500_000);

    for id in &sold_line.inventory_item_ids {
        let unit = item(&engine, id).await;
        assert_eq!(unit.status, InventoryStatus::Sold);
        assert_eq!(unit.sale_id.as_deref(), Some(sale.record.id.as_str()));
        assert!(unit.sold_date.is_some());
    }

    // the cached counter follows the units
    let cached = engine.store().get_product(&phone.id).await.unwrap().unwrap();
    assert_eq!(cached.stock, 3);

    let report = engine.delete_sale(&sale.record.id).await.unwrap();
    assert!(report.is_complete());
    assert!(!report.noop);
    assert_eq!(stock(&engine, &phone).await, 5);

    for unit in &units {
        let unit = item(&engine, &unit.id).await;
        assert_eq!(unit.status, InventoryStatus::InStock);
        assert_eq!(unit.sale_id, None);
        assert_eq!(unit.customer_id, None);
        assert_eq!(unit.sold_date, None);
    }
    assert!(engine.store().get_sale(&sale.record.id).await.unwrap().is_none());
}

on_both_stores!(
    test_sell_then_delete_memory,
    test_sell_then_delete_sqlite,
    sell_then_delete_restores_units
);

async fn second_delete_is_noop(engine: Orchestrator) {
    let cases = plain_product(&engine, "Silicone Case", 10).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&cases, 4)]))
        .await
        .unwrap();
    assert_eq!(stock(&engine, &cases).await, 6);

    engine.delete_sale(&sale.record.id).await.unwrap();
    assert_eq!(stock(&engine, &cases).await, 10);

    let again = engine.delete_sale(&sale.record.id).await.unwrap();
    assert!(again.noop);
    assert!(again.steps.is_empty());
    assert_eq!(stock(&engine, &cases).await, 10);
}

on_both_stores!(
    test_second_delete_memory,
    test_second_delete_sqlite,
    second_delete_is_noop
);

async fn plain_stock_floors_at_zero(engine: Orchestrator) {
    let chargers = plain_product(&engine, "USB-C Charger", 1).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&chargers, 3)]))
        .await
        .unwrap();

    assert!(sale.report.is_complete());
    assert_eq!(sale.record.items[0].quantity, 3);
    assert_eq!(stock(&engine, &chargers).await, 0);
}

on_both_stores!(
    test_plain_floor_memory,
    test_plain_floor_sqlite,
    plain_stock_floors_at_zero
);

#[tokio::test]
async fn test_delete_unknown_sale_is_not_found() {
    let (engine, _store) = memory_engine();
    let err = engine.delete_sale("no-such-sale").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { ref entity, .. } if entity == "Sale"));
}

// =============================================================================
// Explicit units
// =============================================================================

async fn named_imei_is_the_unit_sold(engine: Orchestrator) {
    let (phone, units) = tracked_product(&engine, "Redmi Note 13", 3).await;
    let wanted = &units[2];

    let draft = SaleDraft::new(vec![line(&phone, 1).with_imeis([wanted.imei.clone()])]);
    let sale = engine.create_sale(draft).await.unwrap();

    assert_eq!(sale.record.items[0].inventory_item_ids, vec![wanted.id.clone()]);
    assert_eq!(item(&engine, &wanted.id).await.status, InventoryStatus::Sold);
    assert_eq!(item(&engine, &units[0].id).await.status, InventoryStatus::InStock);
    assert_eq!(stock(&engine, &phone).await, 2);
}

on_both_stores!(
    test_named_imei_memory,
    test_named_imei_sqlite,
    named_imei_is_the_unit_sold
);

#[tokio::test]
async fn test_unknown_imei_rejects_sale_before_any_write() {
    let (engine, _store) = memory_engine();
    let (phone, _) = tracked_product(&engine, "iPhone 12", 2).await;

    let draft = SaleDraft::new(vec![line(&phone, 1).with_imeis([imei()])]);
    let err = engine.create_sale(draft).await.unwrap_err();

    assert!(matches!(err, EngineError::AllocationMismatch { .. }));
    assert!(engine.store().list_sales().await.unwrap().is_empty());
    assert_eq!(stock(&engine, &phone).await, 2);
}

#[tokio::test]
async fn test_named_unit_already_sold_is_rejected() {
    let (engine, _store) = memory_engine();
    let (phone, units) = tracked_product(&engine, "Galaxy S21", 2).await;
    let named = units[0].imei.clone();

    engine
        .create_sale(SaleDraft::new(vec![line(&phone, 1).with_imeis([named.clone()])]))
        .await
        .unwrap();

    let err = engine
        .create_sale(SaleDraft::new(vec![line(&phone, 1).with_imeis([named])]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AllocationMismatch { .. }));
    assert_eq!(stock(&engine, &phone).await, 1);
}

// =============================================================================
// Status
// =============================================================================

async fn pending_sale_holds_no_stock(engine: Orchestrator) {
    let (phone, _) = tracked_product(&engine, "Tecno Spark 20", 2).await;
    let cases = plain_product(&engine, "Flip Cover", 5).await;

    let draft = SaleDraft {
        status: SaleStatus::Pending,
        ..SaleDraft::new(vec![line(&phone, 1), line(&cases, 2)])
    };
    let sale = engine.create_sale(draft).await.unwrap();
    assert!(sale.report.steps.is_empty());
    assert_eq!(stock(&engine, &phone).await, 2);
    assert_eq!(stock(&engine, &cases).await, 5);

    let completed = engine
        .update_sale(
            &sale.record.id,
            SaleUpdate {
                status: Some(SaleStatus::Completed),
                ..SaleUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(completed.report.is_complete());
    assert_eq!(stock(&engine, &phone).await, 1);
    assert_eq!(stock(&engine, &cases).await, 3);

    let cancelled = engine
        .update_sale(
            &sale.record.id,
            SaleUpdate {
                status: Some(SaleStatus::Cancelled),
                ..SaleUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(cancelled.report.is_complete());
    assert_eq!(stock(&engine, &phone).await, 2);
    assert_eq!(stock(&engine, &cases).await, 5);

    // deleting a cancelled sale moves nothing
    engine.delete_sale(&sale.record.id).await.unwrap();
    assert_eq!(stock(&engine, &phone).await, 2);
    assert_eq!(stock(&engine, &cases).await, 5);
}

on_both_stores!(
    test_pending_sale_memory,
    test_pending_sale_sqlite,
    pending_sale_holds_no_stock
);

// =============================================================================
// Update
// =============================================================================

async fn editing_plain_lines_moves_the_difference(engine: Orchestrator) {
    let glass = plain_product(&engine, "Tempered Glass", 10).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&glass, 3)]))
        .await
        .unwrap();
    assert_eq!(stock(&engine, &glass).await, 7);

    let updated = engine
        .update_sale(
            &sale.record.id,
            SaleUpdate {
                items: Some(vec![line(&glass, 5)]),
                ..SaleUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.report.is_complete());
    assert_eq!(stock(&engine, &glass).await, 5);
    assert_eq!(updated.record.items[0].quantity, 5);
    assert_eq!(updated.record.subtotal_cents, 25_000);
}

on_both_stores!(
    test_edit_plain_memory,
    test_edit_plain_sqlite,
    editing_plain_lines_moves_the_difference
);

async fn units_dropped_by_an_edit_stay_sold(engine: Orchestrator) {
    let (phone, _) = tracked_product(&engine, "Galaxy A05", 5).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&phone, 2)]))
        .await
        .unwrap();
    let sold = sale.record.items[0].inventory_item_ids.clone();
    assert_eq!(stock(&engine, &phone).await, 3);

    let updated = engine
        .update_sale(
            &sale.record.id,
            SaleUpdate {
                items: Some(vec![line(&phone, 1)]),
                ..SaleUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.record.items[0].quantity, 1);
    assert!(sold.contains(&updated.record.items[0].inventory_item_ids[0]));
    assert_eq!(stock(&engine, &phone).await, 3);

    let skipped: Vec<_> = updated
        .report
        .steps
        .iter()
        .filter(|s| matches!(s.step.action, Action::RestoreItem { .. }))
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(matches!(skipped[0].status, StepStatus::Skipped { .. }));
    for id in &sold {
        assert_eq!(item(&engine, id).await.status, InventoryStatus::Sold);
    }
}

on_both_stores!(
    test_edit_keeps_units_sold_memory,
    test_edit_keeps_units_sold_sqlite,
    units_dropped_by_an_edit_stay_sold
);

#[tokio::test]
async fn test_growing_a_tracked_line_sells_only_the_extra_units() {
    let (engine, _store) = memory_engine();
    let (phone, _) = tracked_product(&engine, "Nokia G42", 4).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&phone, 1)]))
        .await
        .unwrap();
    let first = sale.record.items[0].inventory_item_ids[0].clone();

    let updated = engine
        .update_sale(
            &sale.record.id,
            SaleUpdate {
                items: Some(vec![line(&phone, 3)]),
                ..SaleUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.report.is_complete());
    let ids = &updated.record.items[0].inventory_item_ids;
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&first));
    assert_eq!(stock(&engine, &phone).await, 1);

    let stored = engine.store().get_sale(&sale.record.id).await.unwrap().unwrap();
    assert_eq!(stored.items, updated.record.items);
    assert_eq!(stored.subtotal_cents, 750_000);
}

#[tokio::test]
async fn test_update_without_changes_moves_nothing() {
    let (engine, _store) = memory_engine();
    let cases = plain_product(&engine, "Leather Case", 8).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&cases, 2)]))
        .await
        .unwrap();

    let updated = engine
        .update_sale(
            &sale.record.id,
            SaleUpdate {
                notes: Some("gift wrap".into()),
                ..SaleUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.report.steps.is_empty());
    assert_eq!(updated.record.notes.as_deref(), Some("gift wrap"));
    assert_eq!(updated.record.total_cents, sale.record.total_cents);
    assert_eq!(stock(&engine, &cases).await, 6);
}

#[tokio::test]
async fn test_generated_sale_number_format() {
    let (engine, _store) = memory_engine();
    let cases = plain_product(&engine, "Pouch", 3).await;
    let sale = engine
        .create_sale(SaleDraft::new(vec![line(&cases, 1)]))
        .await
        .unwrap();

    let number = &sale.record.sale_number;
    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts[0], "INV");
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[1].len(), 6);
    assert_eq!(parts[2].len(), 6);
    assert_eq!(parts[3].len(), 4);
}
