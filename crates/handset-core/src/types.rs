//! # Domain Types
//!
//! Core entities of the reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │◄──│  InventoryItem  │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  stock          │   │  imei (unique)  │   │  store_credit   │       │
//! │  │  product_model  │   │  status         │   └────────▲────────┘       │
//! │  └─────────────────┘   │  sale_id        │            │                │
//! │                        └─────────────────┘            │                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │      Sale       │   │      Swap       │   │      Debt       │       │
//! │  │  items (JSON)   │   │  trade_in_imei  │   │  amount / paid  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                        ┌─────────────────┐                              │
//! │                        │     Return      │                              │
//! │                        │  refund_method  │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Soft Delete
//! Nothing is hard-deleted. `deleted_at` marks removal and every read path in
//! the store filters it out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (825 bps = 8.25%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for config files).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Entity Kind
// =============================================================================

/// Every soft-deletable record type, used by the generic store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    InventoryItem,
    Customer,
    Sale,
    Swap,
    Return,
    Debt,
}

impl EntityKind {
    /// Table backing this entity in the SQLite store.
    pub const fn table(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::InventoryItem => "inventory_items",
            EntityKind::Customer => "customers",
            EntityKind::Sale => "sales",
            EntityKind::Swap => "swaps",
            EntityKind::Return => "returns",
            EntityKind::Debt => "debts",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Product => "Product",
            EntityKind::InventoryItem => "InventoryItem",
            EntityKind::Customer => "Customer",
            EntityKind::Sale => "Sale",
            EntityKind::Swap => "Swap",
            EntityKind::Return => "Return",
            EntityKind::Debt => "Debt",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// ## Dual Stock Representation
/// ```text
/// product_model_id = None       product_model_id = Some(..)
/// ───────────────────────       ───────────────────────────
/// stock is THE count            stock is a cached copy of
/// (counter-backed)              COUNT(items WHERE in_stock)
///                               (ledger-backed)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Authoritative only when `product_model_id` is absent.
    pub stock: i64,
    pub min_stock: i64,
    /// Presence marks the product as IMEI-tracked.
    pub product_model_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Whether stock is derived from per-unit inventory items.
    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.product_model_id.is_some()
    }

    /// Selects where this product's sellable quantity comes from.
    pub fn stock_source(&self) -> StockSource<'_> {
        if self.is_tracked() {
            StockSource::LedgerBacked(&self.id)
        } else {
            StockSource::CounterBacked(self)
        }
    }
}

/// Where a product's sellable quantity is read from.
///
/// Callers go through the stock resolver; the raw `stock` field is only
/// reachable through the `CounterBacked` variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StockSource<'a> {
    /// The product's own counter is authoritative.
    CounterBacked(&'a Product),
    /// Count of in-stock inventory items for this product id.
    LedgerBacked(&'a str),
}

impl StockSource<'_> {
    pub fn product_id(&self) -> &str {
        match self {
            StockSource::CounterBacked(product) => &product.id,
            StockSource::LedgerBacked(id) => id,
        }
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// Lifecycle of a physical, serial-numbered unit.
///
/// ```text
///   in_stock ──sell──► sold ──(delete/undo of that sale only)──► in_stock
///       │
///       └──► returned / defective   (operator decisions, one-way)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    InStock,
    Sold,
    Returned,
    Defective,
}

impl InventoryStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::InStock => "in_stock",
            InventoryStatus::Sold => "sold",
            InventoryStatus::Returned => "returned",
            InventoryStatus::Defective => "defective",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical condition of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    #[default]
    New,
    Refurbished,
    Used,
}

/// One physical handset, keyed by IMEI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    /// Trade-ins registered before a catalog product is chosen have none.
    pub product_id: Option<String>,
    /// Normalised IMEI (15 or 17 digits).
    pub imei: String,
    pub status: InventoryStatus,
    pub condition: ItemCondition,
    pub sale_id: Option<String>,
    pub customer_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub sold_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    /// Sellable right now: not deleted and in stock.
    pub fn is_available(&self) -> bool {
        self.deleted_at.is_none() && self.status == InventoryStatus::InStock
    }

    pub fn belongs_to(&self, product_id: &str) -> bool {
        self.product_id.as_deref() == Some(product_id)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a store-credit balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Signed; the ledger does not enforce a floor.
    pub store_credit_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Customer {
    #[inline]
    pub fn store_credit(&self) -> Money {
        Money::from_cents(self.store_credit_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale.
///
/// Only `Completed` sales hold stock. A stored sale with no status reads as
/// completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl SaleStatus {
    /// Whether a sale in this status has consumed stock.
    #[inline]
    pub fn holds_stock(&self) -> bool {
        matches!(self, SaleStatus::Completed)
    }
}

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    MobileMoney,
    BankTransfer,
    /// Paid out of the customer's store credit.
    Credit,
}

/// A line of a sale or return.
///
/// For tracked products `imeis` / `inventory_item_ids` name the exact units;
/// both empty means "auto-allocate FIFO".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imeis: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventory_item_ids: Vec<String>,
}

impl SaleItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        SaleItem {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: unit_price.cents(),
            ..SaleItem::default()
        }
    }

    /// Pins this line to specific IMEIs.
    pub fn with_imeis<I, S>(mut self, imeis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imeis = imeis.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Whether the line names specific units.
    pub fn has_explicit_refs(&self) -> bool {
        !self.imeis.is_empty() || !self.inventory_item_ids.is_empty()
    }
}

/// A sale transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub sale_number: String,
    pub customer_id: Option<String>,
    /// User id of the cashier, as handed over by the session layer.
    pub cashier_id: Option<String>,
    pub items: Vec<SaleItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Swap
// =============================================================================

/// The status of a swap (trade-in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Completed,
    Cancelled,
}

impl Default for SwapStatus {
    fn default() -> Self {
        SwapStatus::Completed
    }
}

/// A trade-in: the customer hands over one device and buys another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: String,
    pub swap_number: String,
    pub customer_id: Option<String>,
    pub purchased_product_id: String,
    pub purchased_imei: Option<String>,
    /// The unit sold out of stock, when the purchased product is tracked.
    pub inventory_item_id: Option<String>,
    pub trade_in_product_id: Option<String>,
    pub trade_in_imei: String,
    pub trade_in_condition: ItemCondition,
    pub trade_in_value_cents: i64,
    pub difference_paid_cents: i64,
    pub status: SwapStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Return
// =============================================================================

/// Review state of a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl Default for ReturnStatus {
    fn default() -> Self {
        ReturnStatus::Pending
    }
}

impl ReturnStatus {
    /// Whether the refund has been granted in this status.
    #[inline]
    pub fn grants_refund(&self) -> bool {
        matches!(self, ReturnStatus::Approved | ReturnStatus::Completed)
    }
}

/// How a refund is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    Cash,
    StoreCredit,
    OriginalPayment,
    Exchange,
}

/// A customer return against a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Return {
    pub id: String,
    pub return_number: String,
    pub sale_id: Option<String>,
    pub customer_id: Option<String>,
    pub items: Vec<SaleItem>,
    pub refund_amount_cents: i64,
    pub refund_method: RefundMethod,
    pub status: ReturnStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Return {
    #[inline]
    pub fn refund_amount(&self) -> Money {
        Money::from_cents(self.refund_amount_cents)
    }

    /// Store credit this return has put on the customer's balance in the
    /// given status.
    pub fn credit_issued_in(&self, status: ReturnStatus) -> Money {
        if self.refund_method == RefundMethod::StoreCredit
            && self.customer_id.is_some()
            && status.grants_refund()
        {
            self.refund_amount()
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Debt
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Active,
    Paid,
}

/// Money a customer owes the shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: String,
    pub customer_id: Option<String>,
    /// Sale this debt was opened for, if any.
    pub sale_id: Option<String>,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub status: DebtStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Debt {
    /// Amount still owed (never negative).
    pub fn remaining(&self) -> Money {
        Money::from_cents((self.amount_cents - self.paid_cents).max(0))
    }

    /// Paid total and status after applying a payment.
    ///
    /// ```rust
    /// # use handset_core::types::DebtStatus;
    /// # fn debt(amount: i64, paid: i64) -> handset_core::Debt {
    /// #     let now = chrono::Utc::now();
    /// #     handset_core::Debt { id: "d".into(), customer_id: None, sale_id: None,
    /// #         amount_cents: amount, paid_cents: paid, status: DebtStatus::Active,
    /// #         notes: None, created_at: now, updated_at: now, deleted_at: None }
    /// # }
    /// use handset_core::Money;
    ///
    /// let (paid, status) = debt(10_000, 4_000).after_payment(Money::from_cents(6_000));
    /// assert_eq!(paid, 10_000);
    /// assert_eq!(status, DebtStatus::Paid);
    /// ```
    pub fn after_payment(&self, amount: Money) -> (i64, DebtStatus) {
        let paid = self.paid_cents + amount.cents();
        let status = if paid >= self.amount_cents {
            DebtStatus::Paid
        } else {
            DebtStatus::Active
        };
        (paid, status)
    }
}

/// One payment against a debt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayment {
    pub id: String,
    pub debt_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
