//! In-memory manual credit request repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::credits::{ManualCreditRequest, ManualRequestStatus};
use crate::domain::foundation::{DomainError, ErrorCode, ManualRequestId};
use crate::ports::ManualRequestRepository;

#[derive(Default)]
pub struct InMemoryManualRequests {
    requests: RwLock<HashMap<ManualRequestId, ManualCreditRequest>>,
}

impl InMemoryManualRequests {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManualRequestRepository for InMemoryManualRequests {
    async fn create(&self, request: &ManualCreditRequest) -> Result<(), DomainError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Credit request {} already exists", request.id),
            ));
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ManualRequestId,
    ) -> Result<Option<ManualCreditRequest>, DomainError> {
        Ok(self.requests.read().await.get(id).cloned())
    }

    async fn list_by_status(
        &self,
        status: ManualRequestStatus,
    ) -> Result<Vec<ManualCreditRequest>, DomainError> {
        let mut matching: Vec<ManualCreditRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);
        Ok(matching)
    }

    async fn transition(
        &self,
        id: &ManualRequestId,
        from: ManualRequestStatus,
        to: ManualRequestStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(id) {
            Some(request) if request.status == from => {
                request.status = to;
                request.reviewed_at = Some(reviewed_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
