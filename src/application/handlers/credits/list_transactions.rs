//! ListTransactionsHandler - paged transaction history, newest first.

use std::sync::Arc;

use crate::domain::credits::{CreditTransaction, CreditsError};
use crate::domain::foundation::UserId;
use crate::ports::CreditLedger;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ListTransactionsQuery {
    pub user_id: UserId,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub struct ListTransactionsHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl ListTransactionsHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        query: ListTransactionsQuery,
    ) -> Result<Vec<CreditTransaction>, CreditsError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0);

        Ok(self
            .ledger
            .list_transactions(&query.user_id, limit, offset)
            .await?)
    }
}
