//! # Credit Ledger
//!
//! Store-credit balances and customer debts. The ledger applies signed deltas
//! as given; checking that a customer can afford a consumption is the
//! caller's job and happens before any write.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use handset_core::validation::{validate_credit_available, validate_positive};
use handset_core::{Debt, DebtPayment, DebtStatus, Money, ValidationError};

use crate::error::{EngineError, EngineResult, StoreResult};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn RecordStore>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        CreditLedger { store }
    }

    // =========================================================================
    // Store Credit
    // =========================================================================

    /// Adds `delta` (negative to consume) to a customer's balance and returns
    /// the new balance.
    pub async fn apply_credit(&self, customer_id: &str, delta: Money) -> StoreResult<Money> {
        let balance = self
            .store
            .adjust_store_credit(customer_id, delta.cents())
            .await?;
        debug!(customer_id, delta = delta.cents(), balance, "Store credit applied");
        Ok(Money::from_cents(balance))
    }

    pub async fn balance(&self, customer_id: &str) -> EngineResult<Money> {
        let customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))?;
        Ok(customer.store_credit())
    }

    /// Rejects with `InsufficientCredit` when the balance does not cover
    /// `requested`.
    pub async fn ensure_available(&self, customer_id: &str, requested: Money) -> EngineResult<()> {
        let available = self.balance(customer_id).await?;
        validate_credit_available(available, requested)?;
        Ok(())
    }

    // =========================================================================
    // Debts
    // =========================================================================

    /// Σ (amount − paid) over the customer's active debts.
    pub async fn outstanding_debt(&self, customer_id: &str) -> EngineResult<Money> {
        let debts = self.store.list_debts_by_customer(customer_id).await?;
        Ok(debts
            .iter()
            .filter(|d| d.status == DebtStatus::Active)
            .map(Debt::remaining)
            .sum())
    }

    /// Appends a payment and updates the debt in one guarded write.
    ///
    /// Payments against a paid, deleted or unknown debt are rejected.
    pub async fn pay_debt(
        &self,
        debt_id: &str,
        amount: Money,
        notes: Option<String>,
    ) -> EngineResult<Debt> {
        validate_positive("amount", amount)?;

        let debt = self
            .store
            .get_debt(debt_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Debt", debt_id))?;
        if debt.status == DebtStatus::Paid {
            return Err(already_paid(debt_id));
        }

        let payment = DebtPayment {
            id: Uuid::new_v4().to_string(),
            debt_id: debt_id.to_string(),
            amount_cents: amount.cents(),
            date: Utc::now(),
            notes,
        };

        let updated = self
            .store
            .apply_debt_payment(&payment)
            .await?
            .ok_or_else(|| already_paid(debt_id))?;

        info!(
            debt_id,
            amount = amount.cents(),
            paid = updated.paid_cents,
            status = ?updated.status,
            "Debt payment recorded"
        );
        Ok(updated)
    }
}

fn already_paid(debt_id: &str) -> EngineError {
    ValidationError::invalid_format("debt_id", format!("debt {} is already paid", debt_id)).into()
}
