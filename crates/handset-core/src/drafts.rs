//! # Drafts
//!
//! Caller intents handed to the orchestrator. A draft is what the front end
//! submits; the orchestrator turns it into a stored record plus side effects.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::ItemRef;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    ItemCondition, PaymentMethod, RefundMethod, ReturnStatus, SaleItem, SaleStatus, SwapStatus,
    TaxRate,
};
use crate::validation::{
    normalize_imei, normalize_imeis, validate_line_count, validate_name, validate_non_negative,
    validate_positive, validate_quantity, validate_sku, ValidationResult,
};

// =============================================================================
// Catalog Drafts
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub sku: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Opening counter for plain products. Ignored for tracked products,
    /// whose stock comes from registered units.
    pub stock: i64,
    pub min_stock: i64,
    pub product_model_id: Option<String>,
}

impl ProductDraft {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        validate_non_negative("price", Money::from_cents(self.price_cents))?;
        validate_non_negative("cost", Money::from_cents(self.cost_cents))?;
        if self.stock < 0 {
            return Err(ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        if self.min_stock < 0 {
            return Err(ValidationError::OutOfRange {
                field: "min_stock".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDraft {
    pub product_id: String,
    pub imei: String,
    #[serde(default)]
    pub condition: ItemCondition,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub name: String,
    pub phone: Option<String>,
    /// Opening store-credit balance.
    #[serde(default)]
    pub store_credit_cents: i64,
}

impl CustomerDraft {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }
}

// =============================================================================
// Sale Drafts
// =============================================================================

/// Monetary totals of a sale, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl SaleTotals {
    /// Computes totals from lines.
    ///
    /// ```text
    /// subtotal = Σ unit_price × quantity
    /// discount = min(discount, subtotal)
    /// tax      = (subtotal - discount) × rate, rounded half up
    /// total    = subtotal - discount + tax
    /// ```
    pub fn compute(items: &[SaleItem], tax_rate: TaxRate, discount: Money) -> Self {
        let subtotal: Money = items.iter().map(SaleItem::line_total).sum();
        let discount = discount.min(subtotal).max(Money::zero());
        let taxable = subtotal - discount;
        let tax = taxable.calculate_tax(tax_rate);

        SaleTotals {
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            discount_cents: discount.cents(),
            total_cents: (taxable + tax).cents(),
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Intent to record a sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    /// Generated (`INV-...`) when absent.
    pub sale_number: Option<String>,
    pub customer_id: Option<String>,
    pub cashier_id: Option<String>,
    pub items: Vec<SaleItem>,
    #[serde(default)]
    pub tax_rate: TaxRate,
    #[serde(default)]
    pub discount_cents: i64,
    /// Totals computed by the caller; wins over `tax_rate`/`discount_cents`.
    pub totals: Option<SaleTotals>,
    #[serde(default)]
    pub status: SaleStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Store credit consumed by this sale. Defaults to the total when paying
    /// by credit.
    pub store_credit_applied_cents: Option<i64>,
}

impl SaleDraft {
    pub fn new(items: Vec<SaleItem>) -> Self {
        SaleDraft {
            items,
            ..SaleDraft::default()
        }
    }

    /// Effective totals for this draft.
    pub fn totals(&self) -> SaleTotals {
        self.totals.unwrap_or_else(|| {
            SaleTotals::compute(
                &self.items,
                self.tax_rate,
                Money::from_cents(self.discount_cents),
            )
        })
    }

    /// Store credit this sale will consume, if any.
    pub fn credit_to_apply(&self) -> Option<Money> {
        match self.store_credit_applied_cents {
            Some(cents) => Some(Money::from_cents(cents)).filter(Money::is_positive),
            None if self.payment_method == PaymentMethod::Credit => {
                Some(self.totals().total()).filter(Money::is_positive)
            }
            None => None,
        }
    }

    /// Validates the draft and normalises the IMEIs on its lines.
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.items = normalize_line_items(self.items)?;
        validate_non_negative("discount", Money::from_cents(self.discount_cents))?;
        if let Some(cents) = self.store_credit_applied_cents {
            validate_non_negative("store_credit_applied", Money::from_cents(cents))?;
        }
        if self.credit_to_apply().is_some() && self.customer_id.is_none() {
            return Err(ValidationError::required("customer_id"));
        }
        Ok(self)
    }
}

/// Edit of a stored sale. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleUpdate {
    pub items: Option<Vec<SaleItem>>,
    pub status: Option<SaleStatus>,
    pub customer_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    /// Used to recompute totals when items change and `totals` is absent.
    pub tax_rate: Option<TaxRate>,
    pub totals: Option<SaleTotals>,
}

impl SaleUpdate {
    pub fn validated(mut self) -> ValidationResult<Self> {
        if let Some(items) = self.items.take() {
            self.items = Some(normalize_line_items(items)?);
        }
        Ok(self)
    }
}

/// Validates sale/return lines and normalises their IMEIs.
///
/// When a line names explicit units, its quantity must equal the number of
/// units named.
pub fn normalize_line_items(items: Vec<SaleItem>) -> ValidationResult<Vec<SaleItem>> {
    validate_line_count(items.len())?;

    items
        .into_iter()
        .map(|mut item| {
            if item.product_id.trim().is_empty() {
                return Err(ValidationError::required("product_id"));
            }
            validate_quantity(item.quantity)?;
            validate_non_negative("unit_price", item.unit_price())?;
            item.imeis = normalize_imeis(&item.imeis)?;

            let named = explicit_refs(&item).len();
            if named > 0 && named as i64 != item.quantity {
                return Err(ValidationError::invalid_format(
                    "quantity",
                    format!(
                        "line for {} names {} units but asks for {}",
                        item.product_id, named, item.quantity
                    ),
                ));
            }
            Ok(item)
        })
        .collect()
}

/// The explicit unit references on a line.
///
/// Item ids win when both lists are present; the front end sends them as
/// parallel arrays.
pub fn explicit_refs(item: &SaleItem) -> Vec<ItemRef> {
    if !item.inventory_item_ids.is_empty() {
        item.inventory_item_ids
            .iter()
            .map(|id| ItemRef::ItemId(id.clone()))
            .collect()
    } else {
        item.imeis.iter().map(|imei| ItemRef::Imei(imei.clone())).collect()
    }
}

// =============================================================================
// Swap Draft
// =============================================================================

/// Intent to record a trade-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SwapDraft {
    /// Generated (`SWP-...`) when absent.
    pub swap_number: Option<String>,
    pub customer_id: Option<String>,
    pub purchased_product_id: String,
    pub purchased_imei: Option<String>,
    pub inventory_item_id: Option<String>,
    pub trade_in_product_id: Option<String>,
    pub trade_in_imei: String,
    #[serde(default)]
    pub trade_in_condition: ItemCondition,
    pub trade_in_value_cents: i64,
    pub difference_paid_cents: i64,
    #[serde(default)]
    pub status: SwapStatus,
    pub notes: Option<String>,
}

impl SwapDraft {
    pub fn validated(mut self) -> ValidationResult<Self> {
        if self.purchased_product_id.trim().is_empty() {
            return Err(ValidationError::required("purchased_product_id"));
        }
        self.trade_in_imei = normalize_imei(&self.trade_in_imei)?;
        if let Some(imei) = self.purchased_imei.take() {
            let imei = normalize_imei(&imei)?;
            if imei == self.trade_in_imei {
                return Err(ValidationError::invalid_format(
                    "trade_in_imei",
                    "cannot be the device being purchased",
                ));
            }
            self.purchased_imei = Some(imei);
        }
        validate_non_negative("trade_in_value", Money::from_cents(self.trade_in_value_cents))?;
        Ok(self)
    }

    /// Explicit reference to the purchased unit, if the caller named one.
    pub fn purchased_ref(&self) -> Option<ItemRef> {
        self.inventory_item_id
            .clone()
            .map(ItemRef::ItemId)
            .or_else(|| self.purchased_imei.clone().map(ItemRef::Imei))
    }
}

// =============================================================================
// Return Draft
// =============================================================================

/// Intent to record a return.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnDraft {
    /// Generated (`RET-...`) when absent.
    pub return_number: Option<String>,
    pub sale_id: Option<String>,
    pub customer_id: Option<String>,
    pub items: Vec<SaleItem>,
    /// Replacement goods for `exchange` refunds; recorded in notes only.
    #[serde(default)]
    pub exchange_items: Vec<SaleItem>,
    pub refund_amount_cents: i64,
    pub refund_method: RefundMethod,
    #[serde(default)]
    pub status: ReturnStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl ReturnDraft {
    pub fn new(items: Vec<SaleItem>, refund_method: RefundMethod, refund: Money) -> Self {
        ReturnDraft {
            return_number: None,
            sale_id: None,
            customer_id: None,
            items,
            exchange_items: Vec::new(),
            refund_amount_cents: refund.cents(),
            refund_method,
            status: ReturnStatus::default(),
            reason: None,
            notes: None,
        }
    }

    pub fn validated(mut self) -> ValidationResult<Self> {
        self.items = normalize_line_items(self.items)?;
        validate_non_negative("refund_amount", Money::from_cents(self.refund_amount_cents))?;
        if self.refund_method == RefundMethod::StoreCredit
            && self.refund_amount_cents > 0
            && self.customer_id.is_none()
            && self.sale_id.is_none()
        {
            return Err(ValidationError::required("customer_id"));
        }
        Ok(self)
    }
}

// =============================================================================
// Debt Draft
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DebtDraft {
    pub customer_id: Option<String>,
    pub sale_id: Option<String>,
    pub amount_cents: i64,
    pub notes: Option<String>,
}

impl DebtDraft {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive("amount", Money::from_cents(self.amount_cents))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
