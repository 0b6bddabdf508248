//! ListPendingRequestsHandler - admin query for requests awaiting review.

use std::sync::Arc;

use crate::domain::credits::{CreditsError, ManualCreditRequest, ManualRequestStatus};
use crate::ports::ManualRequestRepository;

pub struct ListPendingRequestsHandler {
    repository: Arc<dyn ManualRequestRepository>,
}

impl ListPendingRequestsHandler {
    pub fn new(repository: Arc<dyn ManualRequestRepository>) -> Self {
        Self { repository }
    }

    /// Pending requests, oldest first.
    pub async fn handle(&self) -> Result<Vec<ManualCreditRequest>, CreditsError> {
        Ok(self
            .repository
            .list_by_status(ManualRequestStatus::Pending)
            .await?)
    }
}
