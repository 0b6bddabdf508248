//! SpendCreditsHandler - debits credits for a marketplace action.

use std::sync::Arc;

use crate::domain::credits::{CreditsError, NewTransaction};
use crate::domain::foundation::UserId;
use crate::ports::CreditLedger;

use super::catalog_snapshot::CatalogHandle;

/// Command to pay for an action such as `create_ad`.
#[derive(Debug, Clone)]
pub struct SpendCreditsCommand {
    pub user_id: UserId,
    pub action_type: String,
}

/// Result of a spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendCreditsResult {
    pub new_balance: i64,
    pub cost: i64,
}

/// Handler for spending credits.
///
/// The debit is a conditional update on the balance row, so two concurrent
/// spends can never take the balance below zero.
pub struct SpendCreditsHandler {
    ledger: Arc<dyn CreditLedger>,
    catalog: CatalogHandle,
}

impl SpendCreditsHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>, catalog: CatalogHandle) -> Self {
        Self { ledger, catalog }
    }

    pub async fn handle(&self, cmd: SpendCreditsCommand) -> Result<SpendCreditsResult, CreditsError> {
        let action_type = cmd.action_type.trim();
        if action_type.is_empty() {
            return Err(CreditsError::validation("actionType", "must not be empty"));
        }

        let snapshot = self.catalog.current();
        let cost = snapshot.cost_of(action_type);
        let balance = self.ledger.get_balance(&cmd.user_id).await?;

        if cost <= 0 {
            return Ok(SpendCreditsResult {
                new_balance: balance,
                cost: 0,
            });
        }

        if !snapshot.can_afford(balance, action_type) {
            return Err(CreditsError::insufficient(balance, cost));
        }

        let Some(new_balance) = self.ledger.debit_if_sufficient(&cmd.user_id, cost).await? else {
            // lost a race with another spend
            let balance = self.ledger.get_balance(&cmd.user_id).await?;
            return Err(CreditsError::insufficient(balance, cost));
        };

        let spend = NewTransaction::spend(cmd.user_id.clone(), cost, action_type);
        if let Err(e) = self.ledger.insert_transaction(spend).await {
            tracing::error!(
                user_id = %cmd.user_id,
                action_type,
                cost,
                error = %e,
                "Spend record failed, refunding debit"
            );
            if let Err(refund_err) = self.ledger.adjust_balance(&cmd.user_id, cost).await {
                tracing::error!(
                    user_id = %cmd.user_id,
                    cost,
                    error = %refund_err,
                    "Refund after failed spend record failed"
                );
            }
            return Err(e.into());
        }

        tracing::info!(user_id = %cmd.user_id, action_type, cost, new_balance, "Credits spent");

        Ok(SpendCreditsResult { new_balance, cost })
    }
}
