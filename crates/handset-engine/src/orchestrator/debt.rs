//! Customer debts.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use handset_core::{Debt, DebtDraft, DebtPayment, DebtStatus, Money};

use super::Orchestrator;
use crate::error::{EngineError, EngineResult};

impl Orchestrator {
    /// Opens a debt, optionally tied to a customer and a sale.
    pub async fn create_debt(&self, draft: DebtDraft) -> EngineResult<Debt> {
        draft.validate()?;

        if let Some(customer_id) = &draft.customer_id {
            if self.store.get_customer(customer_id).await?.is_none() {
                return Err(EngineError::not_found("Customer", customer_id));
            }
        }
        if let Some(sale_id) = &draft.sale_id {
            if self.store.get_sale(sale_id).await?.is_none() {
                return Err(EngineError::not_found("Sale", sale_id));
            }
        }

        let now = Utc::now();
        let debt = Debt {
            id: Uuid::new_v4().to_string(),
            customer_id: draft.customer_id,
            sale_id: draft.sale_id,
            amount_cents: draft.amount_cents,
            paid_cents: 0,
            status: DebtStatus::Active,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_debt(&debt).await?;

        info!(debt_id = %debt.id, amount = debt.amount_cents, "Debt created");
        Ok(debt)
    }

    /// Records a payment. The debt flips to paid once fully covered.
    pub async fn record_debt_payment(
        &self,
        debt_id: &str,
        amount: Money,
        notes: Option<String>,
    ) -> EngineResult<Debt> {
        self.ledger.pay_debt(debt_id, amount, notes).await
    }

    pub async fn debt_payments(&self, debt_id: &str) -> EngineResult<Vec<DebtPayment>> {
        Ok(self.store.list_debt_payments(debt_id).await?)
    }
}
