//! ProcessPaymentHandler - the single write path for purchased credits.
//!
//! Every purchase, whether reported by a Stripe webhook or granted through an
//! approved manual request, goes through this handler:
//!
//! 1. Idempotency check on the purchase description.
//! 2. Append the purchase transaction keyed on its source event id and
//!    increment the balance, committed as one unit.
//! 3. Re-read the balance for the log.
//!
//! A unique-constraint conflict in step 2 means a concurrent delivery of the
//! same event won the race; the call then reports `AlreadyProcessed` and
//! leaves the balance alone. A failure in step 2 writes nothing, so the
//! provider's retry credits the purchase.

use std::sync::Arc;

use crate::domain::credits::{
    NewTransaction, PaymentOutcome, PurchaseClaim, PurchaseRecord, PurchaseSource,
};
use crate::domain::foundation::DomainError;
use crate::ports::CreditLedger;

/// Command to apply a purchase to the ledger.
#[derive(Debug, Clone)]
pub struct ProcessPaymentCommand {
    pub claim: PurchaseClaim,
    pub source: PurchaseSource,
}

/// Handler for applying purchases.
pub struct ProcessPaymentHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl ProcessPaymentHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    /// Applies the purchase once per source.
    ///
    /// # Errors
    ///
    /// Datastore failures from the idempotency check or the purchase write.
    /// The caller should surface them so the provider retries.
    pub async fn handle(&self, cmd: ProcessPaymentCommand) -> Result<PaymentOutcome, DomainError> {
        let ProcessPaymentCommand { claim, source } = cmd;
        let source_event_id = source.source_event_id();
        let description = source.description();

        if claim.package_id.is_none() {
            tracing::warn!(
                user_id = %claim.user_id,
                source_event_id = %source_event_id,
                "Purchase has no package id"
            );
        }

        // 1. Already applied?
        if let Some(existing) = self
            .ledger
            .find_transaction_by_description(&claim.user_id, &description)
            .await?
        {
            let new_balance = self.ledger.get_balance(&claim.user_id).await?;
            tracing::info!(
                user_id = %claim.user_id,
                source_event_id = %source_event_id,
                transaction_id = %existing.id,
                new_balance,
                "Purchase already processed"
            );
            return Ok(PaymentOutcome::AlreadyProcessed { new_balance });
        }

        // 2. Append and credit; the unique source id closes the concurrent-delivery race
        let transaction = NewTransaction::purchase(
            claim.user_id.clone(),
            claim.amount,
            claim.package_id.clone(),
            &source,
        );
        let (transaction_id, new_balance) = match self.ledger.record_purchase(transaction).await? {
            PurchaseRecord::Recorded {
                transaction_id,
                new_balance,
            } => (transaction_id, new_balance),
            PurchaseRecord::Conflict => {
                let new_balance = self.ledger.get_balance(&claim.user_id).await?;
                tracing::info!(
                    user_id = %claim.user_id,
                    source_event_id = %source_event_id,
                    new_balance,
                    "Concurrent delivery already recorded this purchase"
                );
                return Ok(PaymentOutcome::AlreadyProcessed { new_balance });
            }
        };

        tracing::info!(
            user_id = %claim.user_id,
            source_event_id = %source_event_id,
            transaction_id = %transaction_id,
            amount = claim.amount,
            new_balance,
            "Credits added"
        );

        // 3. Verify
        match self.ledger.get_balance(&claim.user_id).await {
            Ok(balance) => {
                tracing::debug!(user_id = %claim.user_id, balance, "Verified balance after purchase")
            }
            Err(e) => tracing::warn!(
                user_id = %claim.user_id,
                error = %e,
                "Could not verify balance after purchase"
            ),
        }

        Ok(PaymentOutcome::Credited {
            transaction_id,
            new_balance,
        })
    }
}
