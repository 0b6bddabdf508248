//! ManualRequestRepository port - persistence for manual credit requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::credits::{ManualCreditRequest, ManualRequestStatus};
use crate::domain::foundation::{DomainError, ManualRequestId};

/// Storage for administrator-reviewed credit requests.
#[async_trait]
pub trait ManualRequestRepository: Send + Sync {
    /// Persist a new request.
    async fn create(&self, request: &ManualCreditRequest) -> Result<(), DomainError>;

    /// Find a request by id.
    async fn find_by_id(
        &self,
        id: &ManualRequestId,
    ) -> Result<Option<ManualCreditRequest>, DomainError>;

    /// Requests in the given status, oldest first.
    async fn list_by_status(
        &self,
        status: ManualRequestStatus,
    ) -> Result<Vec<ManualCreditRequest>, DomainError>;

    /// Conditionally move a request from `from` to `to`.
    ///
    /// Implemented as a single `UPDATE ... WHERE status = from`; returns
    /// `false` when the request was not in `from` (lost a concurrent review).
    async fn transition(
        &self,
        id: &ManualRequestId,
        from: ManualRequestStatus,
        to: ManualRequestStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;
}
