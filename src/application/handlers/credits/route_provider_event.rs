//! RouteProviderEventHandler - dispatches classified Stripe events.

use std::sync::Arc;

use crate::domain::credits::{ProviderEvent, WebhookError};
use crate::ports::{CreditLedger, PaymentProvider};

use super::handle_checkout_completed::{
    HandleCheckoutCompletedCommand, HandleCheckoutCompletedHandler,
};
use super::handle_payment_intent::{HandlePaymentIntentCommand, HandlePaymentIntentHandler};
use super::reconciliation::ReconciliationOutcome;

/// Result of routing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEvent {
    /// False for event types this service does not process.
    pub handled: bool,
    pub event_id: String,
    pub event_type: String,
    /// Handler outcome; `None` when not handled.
    pub outcome: Option<ReconciliationOutcome>,
}

/// Routes supported events to their handler and acknowledges the rest.
pub struct RouteProviderEventHandler {
    checkout_completed: HandleCheckoutCompletedHandler,
    payment_intent: HandlePaymentIntentHandler,
}

impl RouteProviderEventHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            checkout_completed: HandleCheckoutCompletedHandler::new(
                ledger.clone(),
                payment_provider.clone(),
            ),
            payment_intent: HandlePaymentIntentHandler::new(ledger, payment_provider),
        }
    }

    pub async fn handle(&self, event: ProviderEvent) -> Result<RoutedEvent, WebhookError> {
        let event_id = event.event_id().to_string();
        let event_type = event.event_type().to_string();

        tracing::info!(event_id = %event_id, event_type = %event_type, "Routing Stripe event");

        let outcome = match event {
            ProviderEvent::CheckoutSessionCompleted { event_id, session } => Some(
                self.checkout_completed
                    .handle(HandleCheckoutCompletedCommand { event_id, session })
                    .await?,
            ),
            ProviderEvent::PaymentIntentSucceeded { event_id, intent } => Some(
                self.payment_intent
                    .handle(HandlePaymentIntentCommand { event_id, intent })
                    .await?,
            ),
            ProviderEvent::Unsupported { .. } => {
                tracing::debug!(event_id = %event_id, event_type = %event_type, "Event type not processed");
                None
            }
        };

        Ok(RoutedEvent {
            handled: outcome.is_some(),
            event_id,
            event_type,
            outcome,
        })
    }
}
