//! GetBalanceHandler - query for a user's current balance.

use std::sync::Arc;

use crate::domain::credits::CreditsError;
use crate::domain::foundation::UserId;
use crate::ports::CreditLedger;

#[derive(Debug, Clone)]
pub struct GetBalanceQuery {
    pub user_id: UserId,
}

pub struct GetBalanceHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl GetBalanceHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    /// Balance, zero for users who never bought or spent.
    pub async fn handle(&self, query: GetBalanceQuery) -> Result<i64, CreditsError> {
        Ok(self.ledger.get_balance(&query.user_id).await?)
    }
}
