//! Returns: create, status changes, delete.
//!
//! A return never moves stock. Its only side effect is store credit, which
//! is owed exactly while the return sits in a refund-granting status:
//!
//! ```text
//! credit owed = refund_amount  if method = store_credit, customer set,
//!                              and status ∈ {approved, completed}
//!             = 0              otherwise
//!
//! every transition applies  owed(new) − owed(old)
//! ```

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use handset_core::notes::{append_note, exchange_note};
use handset_core::numbering::DocumentKind;
use handset_core::{
    Action, EntityKind, Money, RefundMethod, Return, ReturnDraft, ReturnStatus, ValidationError,
};

use super::{next_number, Orchestrator};
use crate::error::{EngineError, EngineResult};
use crate::report::{OperationKind, OperationReport, Recorded};

impl Orchestrator {
    pub async fn create_return(&self, draft: ReturnDraft) -> EngineResult<Recorded<Return>> {
        let draft = draft.validated()?;

        let sale = match &draft.sale_id {
            Some(sale_id) => Some(
                self.store
                    .get_sale(sale_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Sale", sale_id))?,
            ),
            None => None,
        };
        let customer_id = draft
            .customer_id
            .clone()
            .or_else(|| sale.as_ref().and_then(|s| s.customer_id.clone()));
        match &customer_id {
            Some(customer_id) => {
                if self.store.get_customer(customer_id).await?.is_none() {
                    return Err(EngineError::not_found("Customer", customer_id));
                }
            }
            None if draft.refund_method == RefundMethod::StoreCredit
                && draft.refund_amount_cents > 0 =>
            {
                return Err(ValidationError::required("customer_id").into());
            }
            None => {}
        }

        let mut notes = draft.notes.clone();
        if draft.refund_method == RefundMethod::Exchange && !draft.exchange_items.is_empty() {
            notes = Some(append_note(
                notes.as_deref(),
                &exchange_note(&draft.exchange_items),
            ));
        }

        let now = Utc::now();
        let ret = Return {
            id: Uuid::new_v4().to_string(),
            return_number: draft
                .return_number
                .clone()
                .unwrap_or_else(|| next_number(DocumentKind::Return, now)),
            sale_id: draft.sale_id.clone(),
            customer_id,
            items: draft.items.clone(),
            refund_amount_cents: draft.refund_amount_cents,
            refund_method: draft.refund_method,
            status: draft.status,
            reason: draft.reason.clone(),
            notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.insert_return(&ret).await?;

        let mut report = OperationReport::new(OperationKind::CreateReturn, &ret.id);
        if let Some(action) = credit_change(&ret, ret.credit_issued_in(ret.status)) {
            report.push(self.execute(action).await);
        }

        info!(
            return_id = %ret.id,
            return_number = %ret.return_number,
            status = ?ret.status,
            refund = ret.refund_amount_cents,
            "Return created"
        );
        Ok(Recorded {
            record: ret,
            report,
        })
    }

    /// Moves a return to `status`, crediting or reversing store credit by the
    /// difference. Re-applying the current status is a no-op.
    pub async fn update_return_status(
        &self,
        return_id: &str,
        status: ReturnStatus,
    ) -> EngineResult<OperationReport> {
        let stored = self
            .store
            .get_return(return_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Return", return_id))?;
        if stored.status == status {
            return Ok(OperationReport::noop(OperationKind::UpdateReturnStatus, return_id));
        }

        if !self
            .store
            .transition_return_status(return_id, stored.status, status)
            .await?
        {
            warn!(return_id, from = ?stored.status, to = ?status, "Return status changed concurrently");
            return Ok(OperationReport::noop(OperationKind::UpdateReturnStatus, return_id));
        }

        let mut report = OperationReport::new(OperationKind::UpdateReturnStatus, return_id);
        let delta = stored.credit_issued_in(status) - stored.credit_issued_in(stored.status);
        if let Some(action) = credit_change(&stored, delta) {
            report.push(self.execute(action).await);
        }

        info!(return_id, from = ?stored.status, to = ?status, "Return status updated");
        Ok(report)
    }

    /// Soft-deletes a return and takes back any store credit it issued.
    pub async fn delete_return(&self, return_id: &str) -> EngineResult<OperationReport> {
        let stored = self.store.get_return(return_id).await?;
        let Some(ret) = self.claim(EntityKind::Return, return_id, stored).await? else {
            info!(return_id, "Return already deleted");
            return Ok(OperationReport::noop(OperationKind::DeleteReturn, return_id));
        };

        let mut report = OperationReport::new(OperationKind::DeleteReturn, return_id);
        let issued = ret.credit_issued_in(ret.status);
        if let Some(action) = credit_change(&ret, Money::zero() - issued) {
            report.push(self.execute(action).await);
        }

        info!(return_id, reversed = issued.cents(), "Return deleted");
        Ok(report)
    }
}

fn credit_change(ret: &Return, delta: Money) -> Option<Action> {
    match &ret.customer_id {
        Some(customer_id) if !delta.is_zero() => Some(Action::ApplyCredit {
            customer_id: customer_id.clone(),
            delta_cents: delta.cents(),
        }),
        _ => None,
    }
}
