//! # In-Memory Record Store
//!
//! A [`RecordStore`] kept in hash maps behind one `RwLock`. Honours the same
//! guards as the SQLite store and can be told to fail specific writes, which
//! is how the partial-failure paths of the orchestrator are exercised.
//!
//! ```rust,ignore
//! let store = InMemoryStore::new();
//! store.inject(Fault::AdjustStock("p-cases".into())).await;
//! // every adjust_stock on p-cases now fails until clear_faults()
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use handset_core::{
    Customer, Debt, DebtPayment, DebtStatus, EntityKind, InventoryItem, InventoryStatus, Product,
    Return, ReturnStatus, Sale, SaleItem, SaleTotals, Swap,
};

use super::{RecordStore, SoftDelete};
use crate::error::{StoreError, StoreResult};

/// A write (or read) the store should fail on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `get_product` on this product id.
    GetProduct(String),
    /// `adjust_stock` on this product id.
    AdjustStock(String),
    /// `set_stock` on this product id.
    SetStock(String),
    /// `count_in_stock` on this product id.
    CountInStock(String),
    /// `mark_sold` on this item id.
    MarkSold(String),
    /// `restore_item` on this item id.
    RestoreItem(String),
    /// `insert_item` for this IMEI.
    InsertItem(String),
    /// `adjust_store_credit` on this customer id.
    AdjustCredit(String),
    /// `soft_delete` of this record id.
    SoftDelete(String),
    /// Another register sells this item just before our `mark_sold` lands.
    SoldConcurrently(String),
}

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<String, Product>,
    items: HashMap<String, InventoryItem>,
    customers: HashMap<String, Customer>,
    sales: HashMap<String, Sale>,
    swaps: HashMap<String, Swap>,
    returns: HashMap<String, Return>,
    debts: HashMap<String, Debt>,
    payments: Vec<DebtPayment>,
    faults: HashSet<Fault>,
}

impl Tables {
    fn check(&self, fault: Fault) -> StoreResult<()> {
        if self.faults.contains(&fault) {
            debug!(?fault, "Injected store fault");
            return Err(StoreError::Unavailable(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }

    fn live_product_mut(&mut self, id: &str) -> StoreResult<&mut Product> {
        self.products
            .get_mut(id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    fn deletion_slot(
        &mut self,
        kind: EntityKind,
        id: &str,
    ) -> Option<(&mut Option<DateTime<Utc>>, &mut DateTime<Utc>)> {
        match kind {
            EntityKind::Product => self
                .products
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
            EntityKind::InventoryItem => self
                .items
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
            EntityKind::Customer => self
                .customers
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
            EntityKind::Sale => self
                .sales
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
            EntityKind::Swap => self
                .swaps
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
            EntityKind::Return => self
                .returns
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
            EntityKind::Debt => self
                .debts
                .get_mut(id)
                .map(|r| (&mut r.deleted_at, &mut r.updated_at)),
        }
    }
}

fn live<T: Clone>(record: Option<&T>, deleted: impl Fn(&T) -> bool) -> Option<T> {
    record.filter(|r| !deleted(r)).cloned()
}

fn insert_new<T>(table: &mut HashMap<String, T>, id: &str, record: T) -> StoreResult<()> {
    if table.contains_key(id) {
        return Err(StoreError::Constraint(format!("primary key '{}' already used", id)));
    }
    table.insert(id.to_string(), record);
    Ok(())
}

/// In-memory [`RecordStore`] for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every matching call fail until [`clear_faults`](Self::clear_faults).
    pub async fn inject(&self, fault: Fault) {
        self.tables.write().await.faults.insert(fault);
    }

    pub async fn clear_faults(&self) {
        self.tables.write().await.faults.clear();
    }

    /// All live items regardless of product or status.
    pub async fn live_items(&self) -> Vec<InventoryItem> {
        self.tables
            .read()
            .await
            .items
            .values()
            .filter(|i| i.deleted_at.is_none())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let t = self.tables.read().await;
        t.check(Fault::GetProduct(id.to_string()))?;
        Ok(live(t.products.get(id), |p| p.deleted_at.is_some()))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let t = self.tables.read().await;
        let mut products: Vec<Product> = t
            .products
            .values()
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        insert_new(&mut t.products, &product.id, product.clone())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let stored = t.live_product_mut(&product.id)?;
        stored.name = product.name.clone();
        stored.sku = product.sku.clone();
        stored.price_cents = product.price_cents;
        stored.cost_cents = product.cost_cents;
        stored.min_stock = product.min_stock;
        stored.product_model_id = product.product_model_id.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<i64> {
        let mut t = self.tables.write().await;
        t.check(Fault::AdjustStock(product_id.to_string()))?;
        let product = t.live_product_mut(product_id)?;
        product.stock = (product.stock + delta).max(0);
        product.updated_at = Utc::now();
        Ok(product.stock)
    }

    async fn set_stock(&self, product_id: &str, stock: i64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.check(Fault::SetStock(product_id.to_string()))?;
        let product = t.live_product_mut(product_id)?;
        product.stock = stock.max(0);
        product.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    // Inventory Items
    // =========================================================================

    async fn get_item(&self, id: &str) -> StoreResult<Option<InventoryItem>> {
        let t = self.tables.read().await;
        Ok(live(t.items.get(id), |i| i.deleted_at.is_some()))
    }

    async fn find_item_by_imei(&self, imei: &str) -> StoreResult<Option<InventoryItem>> {
        let t = self.tables.read().await;
        Ok(t
            .items
            .values()
            .find(|i| i.deleted_at.is_none() && i.imei == imei)
            .cloned())
    }

    async fn list_in_stock(&self, product_id: &str) -> StoreResult<Vec<InventoryItem>> {
        let t = self.tables.read().await;
        let mut items: Vec<InventoryItem> = t
            .items
            .values()
            .filter(|i| i.is_available() && i.belongs_to(product_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn count_in_stock(&self, product_id: &str) -> StoreResult<i64> {
        let t = self.tables.read().await;
        t.check(Fault::CountInStock(product_id.to_string()))?;
        Ok(t
            .items
            .values()
            .filter(|i| i.is_available() && i.belongs_to(product_id))
            .count() as i64)
    }

    async fn list_items_by_sale(&self, sale_id: &str) -> StoreResult<Vec<InventoryItem>> {
        let t = self.tables.read().await;
        let mut items: Vec<InventoryItem> = t
            .items
            .values()
            .filter(|i| i.deleted_at.is_none() && i.sale_id.as_deref() == Some(sale_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn insert_item(&self, item: &InventoryItem) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.check(Fault::InsertItem(item.imei.clone()))?;
        if t.items
            .values()
            .any(|i| i.deleted_at.is_none() && i.imei == item.imei)
        {
            return Err(StoreError::Duplicate {
                field: "imei".to_string(),
                value: item.imei.clone(),
            });
        }
        insert_new(&mut t.items, &item.id, item.clone())
    }

    async fn mark_sold(
        &self,
        item_id: &str,
        sale_id: Option<&str>,
        customer_id: Option<&str>,
        sold_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        t.check(Fault::MarkSold(item_id.to_string()))?;
        let raced = t
            .faults
            .contains(&Fault::SoldConcurrently(item_id.to_string()));

        let Some(item) = t.items.get_mut(item_id).filter(|i| i.deleted_at.is_none()) else {
            return Ok(false);
        };
        if raced && item.status == InventoryStatus::InStock {
            item.status = InventoryStatus::Sold;
            item.sale_id = Some("concurrent-sale".to_string());
        }
        if item.status != InventoryStatus::InStock {
            return Ok(false);
        }

        item.status = InventoryStatus::Sold;
        item.sale_id = sale_id.map(str::to_string);
        item.customer_id = customer_id.map(str::to_string);
        item.sold_date = Some(sold_at);
        item.updated_at = sold_at;
        Ok(true)
    }

    async fn restore_item(&self, item_id: &str, sale_id: Option<&str>) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        t.check(Fault::RestoreItem(item_id.to_string()))?;

        let Some(item) = t.items.get_mut(item_id).filter(|i| i.deleted_at.is_none()) else {
            return Ok(false);
        };
        let owned = sale_id.map_or(true, |s| item.sale_id.as_deref() == Some(s));
        if item.status != InventoryStatus::Sold || !owned {
            return Ok(false);
        }

        item.status = InventoryStatus::InStock;
        item.sale_id = None;
        item.customer_id = None;
        item.sold_date = None;
        item.updated_at = Utc::now();
        Ok(true)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>> {
        let t = self.tables.read().await;
        Ok(live(t.customers.get(id), |c| c.deleted_at.is_some()))
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        insert_new(&mut t.customers, &customer.id, customer.clone())
    }

    async fn adjust_store_credit(&self, customer_id: &str, delta_cents: i64) -> StoreResult<i64> {
        let mut t = self.tables.write().await;
        t.check(Fault::AdjustCredit(customer_id.to_string()))?;
        let customer = t
            .customers
            .get_mut(customer_id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("Customer", customer_id))?;
        customer.store_credit_cents += delta_cents;
        customer.updated_at = Utc::now();
        Ok(customer.store_credit_cents)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    async fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>> {
        let t = self.tables.read().await;
        Ok(live(t.sales.get(id), |s| s.deleted_at.is_some()))
    }

    async fn list_sales(&self) -> StoreResult<Vec<Sale>> {
        let t = self.tables.read().await;
        let mut sales: Vec<Sale> = t
            .sales
            .values()
            .filter(|s| s.deleted_at.is_none())
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sales)
    }

    async fn insert_sale(&self, sale: &Sale) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        insert_new(&mut t.sales, &sale.id, sale.clone())
    }

    async fn update_sale(&self, sale: &Sale) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let stored = t
            .sales
            .get_mut(&sale.id)
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("Sale", &sale.id))?;
        *stored = Sale {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            deleted_at: None,
            ..sale.clone()
        };
        Ok(())
    }

    async fn update_sale_lines(
        &self,
        sale_id: &str,
        items: &[SaleItem],
        totals: SaleTotals,
    ) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let stored = t
            .sales
            .get_mut(sale_id)
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("Sale", sale_id))?;
        stored.items = items.to_vec();
        stored.subtotal_cents = totals.subtotal_cents;
        stored.tax_cents = totals.tax_cents;
        stored.discount_cents = totals.discount_cents;
        stored.total_cents = totals.total_cents;
        stored.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    // Swaps
    // =========================================================================

    async fn get_swap(&self, id: &str) -> StoreResult<Option<Swap>> {
        let t = self.tables.read().await;
        Ok(live(t.swaps.get(id), |s| s.deleted_at.is_some()))
    }

    async fn list_swaps(&self) -> StoreResult<Vec<Swap>> {
        let t = self.tables.read().await;
        let mut swaps: Vec<Swap> = t
            .swaps
            .values()
            .filter(|s| s.deleted_at.is_none())
            .cloned()
            .collect();
        swaps.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(swaps)
    }

    async fn insert_swap(&self, swap: &Swap) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        insert_new(&mut t.swaps, &swap.id, swap.clone())
    }

    async fn update_swap(&self, swap: &Swap) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let stored = t
            .swaps
            .get_mut(&swap.id)
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("Swap", &swap.id))?;
        stored.purchased_imei = swap.purchased_imei.clone();
        stored.inventory_item_id = swap.inventory_item_id.clone();
        stored.status = swap.status;
        stored.notes = swap.notes.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    // Returns
    // =========================================================================

    async fn get_return(&self, id: &str) -> StoreResult<Option<Return>> {
        let t = self.tables.read().await;
        Ok(live(t.returns.get(id), |r| r.deleted_at.is_some()))
    }

    async fn list_returns(&self) -> StoreResult<Vec<Return>> {
        let t = self.tables.read().await;
        let mut returns: Vec<Return> = t
            .returns
            .values()
            .filter(|r| r.deleted_at.is_none())
            .cloned()
            .collect();
        returns.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(returns)
    }

    async fn insert_return(&self, ret: &Return) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        insert_new(&mut t.returns, &ret.id, ret.clone())
    }

    async fn transition_return_status(
        &self,
        id: &str,
        from: ReturnStatus,
        to: ReturnStatus,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let stored = t
            .returns
            .get_mut(id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("Return", id))?;
        if stored.status != from {
            return Ok(false);
        }
        stored.status = to;
        stored.updated_at = Utc::now();
        Ok(true)
    }

    // =========================================================================
    // Debts
    // =========================================================================

    async fn get_debt(&self, id: &str) -> StoreResult<Option<Debt>> {
        let t = self.tables.read().await;
        Ok(live(t.debts.get(id), |d| d.deleted_at.is_some()))
    }

    async fn list_debts_by_sale(&self, sale_id: &str) -> StoreResult<Vec<Debt>> {
        let t = self.tables.read().await;
        let mut debts: Vec<Debt> = t
            .debts
            .values()
            .filter(|d| d.deleted_at.is_none() && d.sale_id.as_deref() == Some(sale_id))
            .cloned()
            .collect();
        debts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(debts)
    }

    async fn list_debts_by_customer(&self, customer_id: &str) -> StoreResult<Vec<Debt>> {
        let t = self.tables.read().await;
        let mut debts: Vec<Debt> = t
            .debts
            .values()
            .filter(|d| d.deleted_at.is_none() && d.customer_id.as_deref() == Some(customer_id))
            .cloned()
            .collect();
        debts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(debts)
    }

    async fn insert_debt(&self, debt: &Debt) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        insert_new(&mut t.debts, &debt.id, debt.clone())
    }

    async fn apply_debt_payment(&self, payment: &DebtPayment) -> StoreResult<Option<Debt>> {
        let mut t = self.tables.write().await;
        let Some(debt) = t
            .debts
            .get_mut(&payment.debt_id)
            .filter(|d| d.deleted_at.is_none() && d.status == DebtStatus::Active)
        else {
            return Ok(None);
        };

        let (paid, status) =
            debt.after_payment(handset_core::Money::from_cents(payment.amount_cents));
        debt.paid_cents = paid;
        debt.status = status;
        debt.updated_at = payment.date;
        let updated = debt.clone();

        t.payments.push(payment.clone());
        Ok(Some(updated))
    }

    async fn list_debt_payments(&self, debt_id: &str) -> StoreResult<Vec<DebtPayment>> {
        let t = self.tables.read().await;
        let mut payments: Vec<DebtPayment> = t
            .payments
            .iter()
            .filter(|p| p.debt_id == debt_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(payments)
    }

    // =========================================================================
    // Soft Delete
    // =========================================================================

    async fn soft_delete(&self, kind: EntityKind, id: &str) -> StoreResult<SoftDelete> {
        let mut t = self.tables.write().await;
        t.check(Fault::SoftDelete(id.to_string()))?;

        let now = Utc::now();
        Ok(match t.deletion_slot(kind, id) {
            None => SoftDelete::Missing,
            Some((deleted_at, _)) if deleted_at.is_some() => SoftDelete::AlreadyDeleted,
            Some((deleted_at, updated_at)) => {
                *deleted_at = Some(now);
                *updated_at = now;
                SoftDelete::Deleted
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: id.to_string(),
            sku: None,
            price_cents: 1_000,
            cost_cents: 500,
            stock,
            min_stock: 0,
            product_model_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_adjust_stock_floors_and_faults() {
        let store = InMemoryStore::new();
        store.insert_product(&product("p", 1)).await.unwrap();

        assert_eq!(store.adjust_stock("p", -3).await.unwrap(), 0);

        store.inject(Fault::AdjustStock("p".into())).await;
        assert!(matches!(
            store.adjust_stock("p", 1).await,
            Err(StoreError::Unavailable(_))
        ));

        store.clear_faults().await;
        assert_eq!(store.adjust_stock("p", 2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_soft_delete_claims_once() {
        let store = InMemoryStore::new();
        store.insert_product(&product("p", 1)).await.unwrap();

        assert_eq!(
            store.soft_delete(EntityKind::Product, "p").await.unwrap(),
            SoftDelete::Deleted
        );
        assert_eq!(
            store.soft_delete(EntityKind::Product, "p").await.unwrap(),
            SoftDelete::AlreadyDeleted
        );
        assert_eq!(
            store.soft_delete(EntityKind::Sale, "p").await.unwrap(),
            SoftDelete::Missing
        );
        assert!(store.get_product("p").await.unwrap().is_none());
    }
}
