//! CreateManualRequestHandler - records a credit request paid outside Stripe.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::credits::{CreditsError, ManualCreditRequest};
use crate::domain::foundation::UserId;
use crate::ports::ManualRequestRepository;

/// Command to request credits paid by bank transfer, cash, etc.
#[derive(Debug, Clone)]
pub struct CreateManualRequestCommand {
    pub user_id: UserId,
    pub amount: i64,
    pub payment_method: String,
    pub payment_details: Option<String>,
}

pub struct CreateManualRequestHandler {
    repository: Arc<dyn ManualRequestRepository>,
}

impl CreateManualRequestHandler {
    pub fn new(repository: Arc<dyn ManualRequestRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        cmd: CreateManualRequestCommand,
    ) -> Result<ManualCreditRequest, CreditsError> {
        let request = ManualCreditRequest::new(
            cmd.user_id,
            cmd.amount,
            cmd.payment_method,
            cmd.payment_details,
            Utc::now(),
        )?;

        self.repository.create(&request).await?;

        tracing::info!(
            request_id = %request.id,
            user_id = %request.user_id,
            amount = request.amount,
            "Manual credit request created"
        );

        Ok(request)
    }
}
