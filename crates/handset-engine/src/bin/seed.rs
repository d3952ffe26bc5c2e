//! Seeds a database with demo products, handsets and customers.
//!
//! ```text
//! HANDSET_DB_PATH=/tmp/demo.db cargo run -p handset-engine --bin seed
//! ```

use std::error::Error;
use std::sync::Arc;

use tracing::info;

use handset_core::{CustomerDraft, InventoryItemDraft, ItemCondition, ProductDraft};
use handset_db::Database;
use handset_engine::{telemetry, EngineConfig, Orchestrator};

/// Plain accessories: (name, price, cost, stock, min_stock).
const ACCESSORIES: &[(&str, i64, i64, i64, i64)] = &[
    ("Silicone Case", 7_500, 3_000, 40, 10),
    ("USB-C Charger 20W", 15_000, 8_000, 25, 5),
    ("Tempered Glass", 5_000, 1_500, 60, 15),
];

/// Tracked handsets: (name, model id, price, cost, units).
const HANDSETS: &[(&str, &str, i64, i64, u32)] = &[
    ("Galaxy A15", "model-galaxy-a15", 250_000, 210_000, 5),
    ("Redmi Note 13", "model-redmi-note-13", 300_000, 255_000, 4),
    ("iPhone 12 (Refurbished)", "model-iphone-12", 650_000, 560_000, 2),
];

const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Aminata Kamara", "+23276000001", 15_000),
    ("Mohamed Sesay", "+23277000002", 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::load_or_default(None);
    telemetry::init_tracing(Some(&config.logging.filter));

    let db_path = config.database_path();
    info!(?db_path, "Seeding database");
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::new(config.db_config()).await?;
    let engine = Orchestrator::from_config(Arc::new(db), &config);

    for &(name, price, cost, stock, min_stock) in ACCESSORIES {
        engine
            .register_product(ProductDraft {
                name: name.to_string(),
                price_cents: price,
                cost_cents: cost,
                stock,
                min_stock,
                ..ProductDraft::default()
            })
            .await?;
    }

    let mut serial = 0u64;
    for &(name, model, price, cost, units) in HANDSETS {
        let product = engine
            .register_product(ProductDraft {
                name: name.to_string(),
                price_cents: price,
                cost_cents: cost,
                min_stock: 1,
                product_model_id: Some(model.to_string()),
                ..ProductDraft::default()
            })
            .await?;

        let condition = if model.ends_with("iphone-12") {
            ItemCondition::Refurbished
        } else {
            ItemCondition::New
        };
        for _ in 0..units {
            serial += 1;
            engine
                .register_inventory_item(InventoryItemDraft {
                    product_id: product.id.clone(),
                    imei: demo_imei(serial),
                    condition,
                    notes: None,
                })
                .await?;
        }
    }

    for &(name, phone, credit) in CUSTOMERS {
        engine
            .register_customer(CustomerDraft {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                store_credit_cents: credit,
            })
            .await?;
    }

    let products = engine.store().list_products().await?;
    for (product_id, stock) in engine.resolver().resolve_many(&products).await {
        info!(%product_id, stock, "Seeded");
    }
    Ok(())
}

/// A 15-digit IMEI with a valid Luhn check digit: TAC 35693803, then a
/// six-digit serial.
fn demo_imei(serial: u64) -> String {
    let body = format!("35693803{:06}", serial % 1_000_000);
    format!("{}{}", body, luhn_check_digit(&body))
}

fn luhn_check_digit(body: &str) -> u32 {
    let sum: u32 = body
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}
