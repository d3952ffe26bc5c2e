//! Catalog registration: products, serial-numbered units, customers.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use handset_core::validation::normalize_imei;
use handset_core::{
    Customer, CustomerDraft, InventoryItem, InventoryItemDraft, InventoryStatus, Product,
    ProductDraft, ValidationError,
};

use super::Orchestrator;
use crate::error::{EngineError, EngineResult};

impl Orchestrator {
    /// Adds a product. Tracked products start at zero; their stock comes
    /// from registered units.
    pub async fn register_product(&self, draft: ProductDraft) -> EngineResult<Product> {
        draft.validate()?;

        let now = Utc::now();
        let tracked = draft.product_model_id.is_some();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            sku: draft.sku,
            price_cents: draft.price_cents,
            cost_cents: draft.cost_cents,
            stock: if tracked { 0 } else { draft.stock },
            min_stock: draft.min_stock,
            product_model_id: draft.product_model_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_product(&product).await?;

        info!(product_id = %product.id, name = %product.name, tracked, "Product registered");
        Ok(product)
    }

    /// Puts one serial-numbered unit into stock.
    pub async fn register_inventory_item(
        &self,
        draft: InventoryItemDraft,
    ) -> EngineResult<InventoryItem> {
        let imei = normalize_imei(&draft.imei)?;
        let product = self
            .store
            .get_product(&draft.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", &draft.product_id))?;
        if !product.is_tracked() {
            return Err(EngineError::NotTracked {
                product_id: product.id,
            });
        }
        if self.store.find_item_by_imei(&imei).await?.is_some() {
            return Err(ValidationError::duplicate("imei", imei).into());
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            product_id: Some(product.id.clone()),
            imei,
            status: InventoryStatus::InStock,
            condition: draft.condition,
            sale_id: None,
            customer_id: None,
            sold_date: None,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_item(&item).await?;

        if let Err(e) = self.resolver.sync_cached(&product.id).await {
            warn!(product_id = %product.id, error = %e, "Cached stock not refreshed");
        }

        info!(product_id = %product.id, imei = %item.imei, "Unit registered");
        Ok(item)
    }

    pub async fn register_customer(&self, draft: CustomerDraft) -> EngineResult<Customer> {
        draft.validate()?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            phone: draft.phone,
            store_credit_cents: draft.store_credit_cents,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_customer(&customer).await?;

        info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }
}
