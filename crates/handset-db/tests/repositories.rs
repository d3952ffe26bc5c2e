//! Repository behaviour against an in-memory SQLite database.

use chrono::{Duration, Utc};
use handset_core::{
    Debt, DebtPayment, DebtStatus, EntityKind, InventoryItem, InventoryStatus, ItemCondition,
    PaymentMethod, Product, SaleStatus,
};
use handset_db::{Database, DbConfig, DbError, SoftDelete};

async fn database() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn product(id: &str, stock: i64, model: Option<&str>) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        name: format!("Product {}", id),
        sku: None,
        price_cents: 150_000,
        cost_cents: 110_000,
        stock,
        min_stock: 1,
        product_model_id: model.map(str::to_string),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn unit(id: &str, product_id: &str, imei: &str, age_minutes: i64) -> InventoryItem {
    let created = Utc::now() - Duration::minutes(age_minutes);
    InventoryItem {
        id: id.to_string(),
        product_id: Some(product_id.to_string()),
        imei: imei.to_string(),
        status: InventoryStatus::InStock,
        condition: ItemCondition::New,
        sale_id: None,
        customer_id: None,
        sold_date: None,
        notes: None,
        created_at: created,
        updated_at: created,
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_live_imei_is_unique_until_soft_deleted() {
    let db = database().await;
    db.products().insert(&product("p-1", 0, Some("m-1"))).await.unwrap();

    let inventory = db.inventory();
    inventory
        .insert(&unit("i-1", "p-1", "356938035643809", 0))
        .await
        .unwrap();

    let err = inventory
        .insert(&unit("i-2", "p-1", "356938035643809", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "356938035643809"));

    assert_eq!(
        db.soft_delete(EntityKind::InventoryItem, "i-1").await.unwrap(),
        SoftDelete::Deleted
    );
    inventory
        .insert(&unit("i-3", "p-1", "356938035643809", 0))
        .await
        .unwrap();

    let live = inventory.find_by_imei("356938035643809").await.unwrap().unwrap();
    assert_eq!(live.id, "i-3");
}

#[tokio::test]
async fn test_mark_sold_is_guarded_by_in_stock_status() {
    let db = database().await;
    db.products().insert(&product("p-1", 0, Some("m-1"))).await.unwrap();
    let inventory = db.inventory();
    inventory
        .insert(&unit("i-1", "p-1", "356938035643809", 0))
        .await
        .unwrap();

    let now = Utc::now();
    assert!(inventory.mark_sold("i-1", Some("s-1"), Some("c-1"), now).await.unwrap());
    assert!(!inventory.mark_sold("i-1", Some("s-2"), None, now).await.unwrap());

    let sold = inventory.get_by_id("i-1").await.unwrap().unwrap();
    assert_eq!(sold.status, InventoryStatus::Sold);
    assert_eq!(sold.sale_id.as_deref(), Some("s-1"));
    assert_eq!(inventory.count_in_stock("p-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_restore_only_undoes_the_owning_sale() {
    let db = database().await;
    db.products().insert(&product("p-1", 0, Some("m-1"))).await.unwrap();
    let inventory = db.inventory();
    inventory
        .insert(&unit("i-1", "p-1", "356938035643809", 0))
        .await
        .unwrap();
    inventory
        .mark_sold("i-1", Some("s-1"), Some("c-1"), Utc::now())
        .await
        .unwrap();

    assert!(!inventory.restore("i-1", Some("s-other")).await.unwrap());
    assert!(inventory.restore("i-1", Some("s-1")).await.unwrap());

    let restored = inventory.get_by_id("i-1").await.unwrap().unwrap();
    assert_eq!(restored.status, InventoryStatus::InStock);
    assert!(restored.sale_id.is_none());
    assert!(restored.customer_id.is_none());
    assert!(restored.sold_date.is_none());
}

#[tokio::test]
async fn test_in_stock_listing_is_oldest_first() {
    let db = database().await;
    db.products().insert(&product("p-1", 0, Some("m-1"))).await.unwrap();
    let inventory = db.inventory();
    inventory.insert(&unit("young", "p-1", "356938035643809", 1)).await.unwrap();
    inventory.insert(&unit("old", "p-1", "356938035643817", 30)).await.unwrap();
    inventory.insert(&unit("mid", "p-1", "356938035643825", 10)).await.unwrap();

    let ids: Vec<String> = inventory
        .list_in_stock("p-1")
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, ["old", "mid", "young"]);
}

#[tokio::test]
async fn test_adjust_stock_floors_at_zero() {
    let db = database().await;
    let products = db.products();
    products.insert(&product("p-1", 2, None)).await.unwrap();

    assert_eq!(products.adjust_stock("p-1", -5).await.unwrap(), 0);
    assert_eq!(products.adjust_stock("p-1", 3).await.unwrap(), 3);

    let err = products.adjust_stock("missing", 1).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn test_soft_delete_reports_each_outcome() {
    let db = database().await;
    db.products().insert(&product("p-1", 1, None)).await.unwrap();

    assert_eq!(
        db.soft_delete(EntityKind::Product, "p-1").await.unwrap(),
        SoftDelete::Deleted
    );
    assert_eq!(
        db.soft_delete(EntityKind::Product, "p-1").await.unwrap(),
        SoftDelete::AlreadyDeleted
    );
    assert_eq!(
        db.soft_delete(EntityKind::Product, "nope").await.unwrap(),
        SoftDelete::Missing
    );
    assert!(db.products().get_by_id("p-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_legacy_sale_row_decodes_leniently() {
    let db = database().await;
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO sales (id, sale_number, items, total_cents, status, payment_method, notes, created_at, updated_at)
        VALUES ('s-legacy', 'INV-OLD', ?1, 15000, NULL, 'credit', 'Credit: NLe 150.00', ?2, ?2)
        "#,
    )
    .bind(r#"[{"product_id":"p-1","qty":"2","price":75.5,"imeis":"356938035643809, 356938035643817"}, 7]"#)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    let sale = db.sales().get_by_id("s-legacy").await.unwrap().unwrap();
    assert_eq!(sale.status, SaleStatus::Completed);
    assert_eq!(sale.payment_method, PaymentMethod::Credit);
    assert_eq!(sale.items.len(), 1);
    assert_eq!(sale.items[0].product_id, "p-1");
    assert_eq!(sale.items[0].quantity, 2);
    assert_eq!(sale.items[0].unit_price_cents, 7_550);
    assert_eq!(sale.items[0].imeis.len(), 2);

    sqlx::query("UPDATE sales SET items = 'not json' WHERE id = 's-legacy'")
        .execute(db.pool())
        .await
        .unwrap();
    let sale = db.sales().get_by_id("s-legacy").await.unwrap().unwrap();
    assert!(sale.items.is_empty());
}

#[tokio::test]
async fn test_debt_payment_is_guarded_and_appended() {
    let db = database().await;
    let now = Utc::now();
    let debts = db.debts();
    debts
        .insert(&Debt {
            id: "d-1".to_string(),
            customer_id: Some("c-1".to_string()),
            sale_id: Some("s-1".to_string()),
            amount_cents: 10_000,
            paid_cents: 0,
            status: DebtStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await
        .unwrap();

    let payment = |id: &str, cents: i64| DebtPayment {
        id: id.to_string(),
        debt_id: "d-1".to_string(),
        amount_cents: cents,
        date: Utc::now(),
        notes: None,
    };

    let debt = debts.apply_payment(&payment("pay-1", 4_000)).await.unwrap().unwrap();
    assert_eq!(debt.paid_cents, 4_000);
    assert_eq!(debt.status, DebtStatus::Active);

    let debt = debts.apply_payment(&payment("pay-2", 6_000)).await.unwrap().unwrap();
    assert_eq!(debt.paid_cents, 10_000);
    assert_eq!(debt.status, DebtStatus::Paid);

    assert!(debts.apply_payment(&payment("pay-3", 1_000)).await.unwrap().is_none());
    assert_eq!(debts.list_payments("d-1").await.unwrap().len(), 2);
}
