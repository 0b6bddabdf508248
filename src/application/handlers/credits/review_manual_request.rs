//! ReviewManualRequestHandler - approves or rejects a manual credit request.
//!
//! The status change is a conditional update (`pending` to the decision), so
//! two administrators reviewing the same request cannot both win. Approval
//! then credits through `ProcessPaymentHandler` keyed on `manual:{id}`;
//! approving an already approved request re-runs that step, which is a no-op
//! once the credit exists and completes it if a previous attempt stopped
//! between the status change and the credit.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::credits::{
    CreditsError, ManualCreditRequest, ManualRequestStatus, PaymentOutcome, PurchaseClaim,
};
use crate::domain::foundation::ManualRequestId;
use crate::ports::{CreditLedger, ManualRequestRepository};

use super::process_payment::{ProcessPaymentCommand, ProcessPaymentHandler};

/// Administrator decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    fn target(&self) -> ManualRequestStatus {
        match self {
            ReviewDecision::Approve => ManualRequestStatus::Approved,
            ReviewDecision::Reject => ManualRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewManualRequestCommand {
    pub request_id: ManualRequestId,
    pub decision: ReviewDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewManualRequestResult {
    pub request: ManualCreditRequest,
    /// Ledger outcome for approvals, `None` for rejections.
    pub payment: Option<PaymentOutcome>,
}

pub struct ReviewManualRequestHandler {
    repository: Arc<dyn ManualRequestRepository>,
    process_payment: ProcessPaymentHandler,
}

impl ReviewManualRequestHandler {
    pub fn new(repository: Arc<dyn ManualRequestRepository>, ledger: Arc<dyn CreditLedger>) -> Self {
        Self {
            repository,
            process_payment: ProcessPaymentHandler::new(ledger),
        }
    }

    pub async fn handle(
        &self,
        cmd: ReviewManualRequestCommand,
    ) -> Result<ReviewManualRequestResult, CreditsError> {
        let target = cmd.decision.target();
        let request = self.load(&cmd.request_id).await?;

        let request = if request.is_pending() {
            let moved = self
                .repository
                .transition(&request.id, ManualRequestStatus::Pending, target, Utc::now())
                .await?;
            let current = self.load(&cmd.request_id).await?;
            if !moved && current.status != target {
                return Err(CreditsError::not_pending(current.id, current.status));
            }
            current
        } else {
            request
        };

        match cmd.decision {
            ReviewDecision::Reject => {
                if request.status != ManualRequestStatus::Rejected {
                    return Err(CreditsError::not_pending(request.id, request.status));
                }
                tracing::info!(request_id = %request.id, "Manual credit request rejected");
                Ok(ReviewManualRequestResult {
                    request,
                    payment: None,
                })
            }
            ReviewDecision::Approve => {
                if request.status != ManualRequestStatus::Approved {
                    return Err(CreditsError::not_pending(request.id, request.status));
                }
                let payment = self.credit(&request).await?;
                tracing::info!(
                    request_id = %request.id,
                    user_id = %request.user_id,
                    amount = request.amount,
                    already_processed = payment.already_processed(),
                    "Manual credit request approved"
                );
                Ok(ReviewManualRequestResult {
                    request,
                    payment: Some(payment),
                })
            }
        }
    }

    async fn load(&self, id: &ManualRequestId) -> Result<ManualCreditRequest, CreditsError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(CreditsError::RequestNotFound(*id))
    }

    async fn credit(&self, request: &ManualCreditRequest) -> Result<PaymentOutcome, CreditsError> {
        let claim = PurchaseClaim::new(request.user_id.clone(), None, request.amount)
            .ok_or_else(|| CreditsError::validation("amount", "must be positive"))?;

        Ok(self
            .process_payment
            .handle(ProcessPaymentCommand {
                claim,
                source: request.source(),
            })
            .await?)
    }
}
