//! HandlePaymentIntentHandler - reconciles `payment_intent.succeeded`.
//!
//! Stripe sends this event alongside `checkout.session.completed` for the same
//! payment, in either order. Both handlers key on the checkout session id, so
//! whichever arrives first performs the credit and the other is deduplicated.
//! The intent id is only used as the key when Stripe confirms there is no
//! session; a failed lookup aborts with a retryable error instead.

use std::sync::Arc;

use crate::domain::credits::{
    CheckoutSessionObject, PaymentIntentObject, PurchaseSource, WebhookError,
};
use crate::ports::{CreditLedger, PaymentProvider};

use super::extract_purchase::{PurchaseExtractor, PurchaseSources};
use super::process_payment::{ProcessPaymentCommand, ProcessPaymentHandler};
use super::reconciliation::{ReconciliationOutcome, NO_METADATA_FOR_INTENT};

/// Command carrying a succeeded payment intent.
#[derive(Debug, Clone)]
pub struct HandlePaymentIntentCommand {
    pub event_id: String,
    pub intent: PaymentIntentObject,
}

/// Credits the buyer behind a payment intent.
pub struct HandlePaymentIntentHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    extractor: PurchaseExtractor,
    process_payment: ProcessPaymentHandler,
}

impl HandlePaymentIntentHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            extractor: PurchaseExtractor::for_payment_intent(payment_provider.clone()),
            payment_provider,
            process_payment: ProcessPaymentHandler::new(ledger),
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentIntentCommand,
    ) -> Result<ReconciliationOutcome, WebhookError> {
        let intent = &cmd.intent;
        let session = self.find_session(intent).await?;

        let claim = self
            .extractor
            .extract(PurchaseSources {
                intent: Some(intent),
                session: session.as_ref(),
            })
            .await?;

        let Some(claim) = claim else {
            tracing::warn!(
                event_id = %cmd.event_id,
                event_type = "payment_intent.succeeded",
                payment_intent = %intent.id,
                session_found = session.is_some(),
                "Could not find or construct purchase metadata"
            );
            return Ok(ReconciliationOutcome::skipped(NO_METADATA_FOR_INTENT));
        };

        // Same key as checkout.session.completed when a session exists
        let key = session
            .as_ref()
            .map(|s| s.id.clone())
            .unwrap_or_else(|| intent.id.clone());

        let payment = self
            .process_payment
            .handle(ProcessPaymentCommand {
                claim: claim.clone(),
                source: PurchaseSource::Stripe(key.clone()),
            })
            .await?;

        Ok(ReconciliationOutcome::Applied {
            user_id: claim.user_id,
            amount: claim.amount,
            source_event_id: key,
            payment,
        })
    }

    /// The session behind the intent, `None` only when Stripe reports none.
    async fn find_session(
        &self,
        intent: &PaymentIntentObject,
    ) -> Result<Option<CheckoutSessionObject>, WebhookError> {
        let sessions = self
            .payment_provider
            .find_sessions_by_payment_intent(&intent.id)
            .await
            .map_err(|e| {
                tracing::error!(
                    payment_intent = %intent.id,
                    error = %e,
                    "Checkout session lookup failed"
                );
                WebhookError::Provider(e.to_string())
            })?;

        if sessions.len() > 1 {
            tracing::warn!(
                payment_intent = %intent.id,
                count = sessions.len(),
                "Multiple checkout sessions for payment intent, using the first"
            );
        }
        Ok(sessions.into_iter().next())
    }
}
