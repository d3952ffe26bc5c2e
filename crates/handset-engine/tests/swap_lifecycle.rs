//! Trade-in swaps: the purchased device leaves stock, the handed-over device
//! enters it, and deleting the swap undoes both.

mod common;

use common::*;
use handset_core::notes::trade_in_tag;
use handset_core::{
    Action, InventoryStatus, ItemCondition, Product, SaleDraft, StepStatus, SwapDraft, SwapStatus,
    TradeIn, ValidationError,
};
use handset_engine::{EngineError, Orchestrator};

const TRADE_IN_IMEI: &str = "123456789012345";

fn swap_draft(purchased: &Product, trade_in_product: Option<&Product>, trade_in_imei: &str) -> SwapDraft {
    SwapDraft {
        purchased_product_id: purchased.id.clone(),
        trade_in_product_id: trade_in_product.map(|p| p.id.clone()),
        trade_in_imei: trade_in_imei.to_string(),
        trade_in_condition: ItemCondition::Used,
        trade_in_value_cents: 120_000,
        difference_paid_cents: 130_000,
        status: SwapStatus::Completed,
        ..SwapDraft::default()
    }
}

async fn swap_round_trip(engine: Orchestrator) {
    let (new_phones, _) = tracked_product(&engine, "Galaxy A25", 2).await;
    let (used_phones, _) = tracked_product(&engine, "Used Galaxy", 0).await;

    let swap = engine
        .create_swap(swap_draft(&new_phones, Some(&used_phones), TRADE_IN_IMEI))
        .await
        .unwrap();
    assert!(swap.report.is_complete());
    assert_eq!(stock(&engine, &new_phones).await, 1);
    assert_eq!(stock(&engine, &used_phones).await, 1);

    let sold_id = swap.record.inventory_item_id.clone().unwrap();
    let sold = item(&engine, &sold_id).await;
    assert_eq!(sold.status, InventoryStatus::Sold);
    assert_eq!(sold.sale_id, None);
    assert_eq!(swap.record.purchased_imei.as_deref(), Some(sold.imei.as_str()));

    let trade_in = engine
        .store()
        .find_item_by_imei(TRADE_IN_IMEI)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(trade_in.status, InventoryStatus::InStock);
    assert_eq!(trade_in.condition, ItemCondition::Used);
    assert_eq!(trade_in.product_id.as_deref(), Some(used_phones.id.as_str()));
    assert!(trade_in
        .notes
        .as_deref()
        .unwrap()
        .contains(&trade_in_tag(&swap.record.swap_number)));
    assert!(swap.record.swap_number.starts_with("SWP-"));

    let report = engine.delete_swap(&swap.record.id).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(stock(&engine, &new_phones).await, 2);
    assert_eq!(stock(&engine, &used_phones).await, 0);
    assert_eq!(item(&engine, &sold_id).await.status, InventoryStatus::InStock);
    assert!(engine
        .store()
        .find_item_by_imei(TRADE_IN_IMEI)
        .await
        .unwrap()
        .is_none());

    let again = engine.delete_swap(&swap.record.id).await.unwrap();
    assert!(again.noop);
}

#[tokio::test]
async fn test_swap_round_trip_memory() {
    let (engine, _store) = memory_engine();
    swap_round_trip(engine).await;
}

#[tokio::test]
async fn test_swap_round_trip_sqlite() {
    swap_round_trip(sqlite_engine().await).await;
}

#[tokio::test]
async fn test_swap_of_plain_product_moves_counter() {
    let (engine, _store) = memory_engine();
    let feature_phones = plain_product(&engine, "Itel 2160", 4).await;

    let swap = engine
        .create_swap(swap_draft(&feature_phones, None, &imei()))
        .await
        .unwrap();
    assert!(swap.report.is_complete());
    assert_eq!(swap.record.inventory_item_id, None);
    assert_eq!(stock(&engine, &feature_phones).await, 3);

    engine.delete_swap(&swap.record.id).await.unwrap();
    assert_eq!(stock(&engine, &feature_phones).await, 4);
}

#[tokio::test]
async fn test_named_purchased_unit_is_sold() {
    let (engine, _store) = memory_engine();
    let (phones, units) = tracked_product(&engine, "Pixel 7a", 3).await;

    let draft = SwapDraft {
        purchased_imei: Some(units[1].imei.clone()),
        ..swap_draft(&phones, None, &imei())
    };
    let swap = engine.create_swap(draft).await.unwrap();

    assert_eq!(swap.record.inventory_item_id.as_deref(), Some(units[1].id.as_str()));
    assert_eq!(item(&engine, &units[1].id).await.status, InventoryStatus::Sold);
    assert_eq!(item(&engine, &units[0].id).await.status, InventoryStatus::InStock);
}

#[tokio::test]
async fn test_live_trade_in_imei_is_rejected() {
    let (engine, _store) = memory_engine();
    let (phones, units) = tracked_product(&engine, "Galaxy M14", 2).await;

    let err = engine
        .create_swap(swap_draft(&phones, None, &units[0].imei))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::Duplicate { .. })
    ));
    assert!(engine.store().list_swaps().await.unwrap().is_empty());
    assert_eq!(stock(&engine, &phones).await, 2);
}

#[tokio::test]
async fn test_pending_swap_moves_nothing() {
    let (engine, _store) = memory_engine();
    let (phones, _) = tracked_product(&engine, "Moto G54", 2).await;
    let trade_in_imei = imei();

    let draft = SwapDraft {
        status: SwapStatus::Pending,
        ..swap_draft(&phones, None, &trade_in_imei)
    };
    let swap = engine.create_swap(draft).await.unwrap();

    assert!(swap.report.steps.is_empty());
    assert_eq!(stock(&engine, &phones).await, 2);
    assert!(engine
        .store()
        .find_item_by_imei(&trade_in_imei)
        .await
        .unwrap()
        .is_none());

    let report = engine.delete_swap(&swap.record.id).await.unwrap();
    assert!(report.steps.is_empty());
    assert_eq!(stock(&engine, &phones).await, 2);
}

#[tokio::test]
async fn test_resold_trade_in_survives_swap_delete() {
    let (engine, _store) = memory_engine();
    let (phones, _) = tracked_product(&engine, "Galaxy A35", 1).await;
    let (used_phones, _) = tracked_product(&engine, "Used Phones", 0).await;
    let trade_in_imei = imei();

    let swap = engine
        .create_swap(swap_draft(&phones, Some(&used_phones), &trade_in_imei))
        .await
        .unwrap();

    // the trade-in is sold on before the swap is deleted
    let resale = engine
        .create_sale(SaleDraft::new(vec![
            line(&used_phones, 1).with_imeis([trade_in_imei.clone()])
        ]))
        .await
        .unwrap();
    assert!(resale.report.is_complete());

    let report = engine.delete_swap(&swap.record.id).await.unwrap();
    let removal = report
        .steps
        .iter()
        .find(|s| matches!(s.step.action, Action::RemoveTradeIn(_)))
        .unwrap();
    assert!(matches!(removal.status, StepStatus::Skipped { .. }));

    let trade_in = engine
        .store()
        .find_item_by_imei(&trade_in_imei)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(trade_in.status, InventoryStatus::Sold);
    assert_eq!(trade_in.sale_id.as_deref(), Some(resale.record.id.as_str()));
    assert_eq!(stock(&engine, &phones).await, 1);
}

#[tokio::test]
async fn test_unit_with_foreign_tag_is_not_removed() {
    let (engine, _store) = memory_engine();
    let (phones, _) = tracked_product(&engine, "Honor X6", 2).await;
    let (used_phones, _) = tracked_product(&engine, "Used Honor", 0).await;
    let trade_in_imei = imei();

    let swap = engine
        .create_swap(swap_draft(&phones, Some(&used_phones), &trade_in_imei))
        .await
        .unwrap();

    let outcome = engine
        .execute(Action::RemoveTradeIn(TradeIn {
            imei: trade_in_imei.clone(),
            swap_number: "SWP-240101-120000-0001".to_string(),
            product_id: Some(used_phones.id.clone()),
            condition: ItemCondition::Used,
        }))
        .await;
    assert!(matches!(outcome.status, StepStatus::Skipped { .. }));
    assert_eq!(stock(&engine, &used_phones).await, 1);

    engine.delete_swap(&swap.record.id).await.unwrap();
    assert_eq!(stock(&engine, &used_phones).await, 0);
}
