//! [`RecordStore`] over the SQLite [`Database`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use handset_core::{
    Customer, Debt, DebtPayment, EntityKind, InventoryItem, Product, Return, ReturnStatus, Sale,
    SaleItem, SaleTotals, Swap,
};
use handset_db::Database;

use super::{RecordStore, SoftDelete};
use crate::error::StoreResult;

#[async_trait]
impl RecordStore for Database {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products().get_by_id(id).await?)
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products().list().await?)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.products().insert(product).await?;
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        Ok(self.products().update(product).await?)
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> StoreResult<i64> {
        Ok(self.products().adjust_stock(product_id, delta).await?)
    }

    async fn set_stock(&self, product_id: &str, stock: i64) -> StoreResult<()> {
        Ok(self.products().set_stock(product_id, stock).await?)
    }

    async fn get_item(&self, id: &str) -> StoreResult<Option<InventoryItem>> {
        Ok(self.inventory().get_by_id(id).await?)
    }

    async fn find_item_by_imei(&self, imei: &str) -> StoreResult<Option<InventoryItem>> {
        Ok(self.inventory().find_by_imei(imei).await?)
    }

    async fn list_in_stock(&self, product_id: &str) -> StoreResult<Vec<InventoryItem>> {
        Ok(self.inventory().list_in_stock(product_id).await?)
    }

    async fn count_in_stock(&self, product_id: &str) -> StoreResult<i64> {
        Ok(self.inventory().count_in_stock(product_id).await?)
    }

    async fn list_items_by_sale(&self, sale_id: &str) -> StoreResult<Vec<InventoryItem>> {
        Ok(self.inventory().list_by_sale(sale_id).await?)
    }

    async fn insert_item(&self, item: &InventoryItem) -> StoreResult<()> {
        self.inventory().insert(item).await?;
        Ok(())
    }

    async fn mark_sold(
        &self,
        item_id: &str,
        sale_id: Option<&str>,
        customer_id: Option<&str>,
        sold_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self
            .inventory()
            .mark_sold(item_id, sale_id, customer_id, sold_at)
            .await?)
    }

    async fn restore_item(&self, item_id: &str, sale_id: Option<&str>) -> StoreResult<bool> {
        Ok(self.inventory().restore(item_id, sale_id).await?)
    }

    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>> {
        Ok(self.customers().get_by_id(id).await?)
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        self.customers().insert(customer).await?;
        Ok(())
    }

    async fn adjust_store_credit(&self, customer_id: &str, delta_cents: i64) -> StoreResult<i64> {
        Ok(self
            .customers()
            .adjust_store_credit(customer_id, delta_cents)
            .await?)
    }

    async fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>> {
        Ok(self.sales().get_by_id(id).await?)
    }

    async fn list_sales(&self) -> StoreResult<Vec<Sale>> {
        Ok(self.sales().list().await?)
    }

    async fn insert_sale(&self, sale: &Sale) -> StoreResult<()> {
        Ok(self.sales().insert(sale).await?)
    }

    async fn update_sale(&self, sale: &Sale) -> StoreResult<()> {
        Ok(self.sales().update(sale).await?)
    }

    async fn update_sale_lines(
        &self,
        sale_id: &str,
        items: &[SaleItem],
        totals: SaleTotals,
    ) -> StoreResult<()> {
        Ok(self.sales().update_lines(sale_id, items, totals).await?)
    }

    async fn get_swap(&self, id: &str) -> StoreResult<Option<Swap>> {
        Ok(self.swaps().get_by_id(id).await?)
    }

    async fn list_swaps(&self) -> StoreResult<Vec<Swap>> {
        Ok(self.swaps().list().await?)
    }

    async fn insert_swap(&self, swap: &Swap) -> StoreResult<()> {
        Ok(self.swaps().insert(swap).await?)
    }

    async fn update_swap(&self, swap: &Swap) -> StoreResult<()> {
        Ok(self.swaps().update(swap).await?)
    }

    async fn get_return(&self, id: &str) -> StoreResult<Option<Return>> {
        Ok(self.returns().get_by_id(id).await?)
    }

    async fn list_returns(&self) -> StoreResult<Vec<Return>> {
        Ok(self.returns().list().await?)
    }

    async fn insert_return(&self, ret: &Return) -> StoreResult<()> {
        Ok(self.returns().insert(ret).await?)
    }

    async fn transition_return_status(
        &self,
        id: &str,
        from: ReturnStatus,
        to: ReturnStatus,
    ) -> StoreResult<bool> {
        Ok(self.returns().transition_status(id, from, to).await?)
    }

    async fn get_debt(&self, id: &str) -> StoreResult<Option<Debt>> {
        Ok(self.debts().get_by_id(id).await?)
    }

    async fn list_debts_by_sale(&self, sale_id: &str) -> StoreResult<Vec<Debt>> {
        Ok(self.debts().list_by_sale(sale_id).await?)
    }

    async fn list_debts_by_customer(&self, customer_id: &str) -> StoreResult<Vec<Debt>> {
        Ok(self.debts().list_by_customer(customer_id).await?)
    }

    async fn insert_debt(&self, debt: &Debt) -> StoreResult<()> {
        Ok(self.debts().insert(debt).await?)
    }

    async fn apply_debt_payment(&self, payment: &DebtPayment) -> StoreResult<Option<Debt>> {
        Ok(self.debts().apply_payment(payment).await?)
    }

    async fn list_debt_payments(&self, debt_id: &str) -> StoreResult<Vec<DebtPayment>> {
        Ok(self.debts().list_payments(debt_id).await?)
    }

    async fn soft_delete(&self, kind: EntityKind, id: &str) -> StoreResult<SoftDelete> {
        Ok(Database::soft_delete(self, kind, id).await?)
    }
}
