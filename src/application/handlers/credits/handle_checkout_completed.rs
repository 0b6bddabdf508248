//! HandleCheckoutCompletedHandler - reconciles `checkout.session.completed`.

use std::sync::Arc;

use crate::domain::credits::{CheckoutSessionObject, PurchaseSource, WebhookError};
use crate::ports::{CreditLedger, PaymentProvider};

use super::extract_purchase::{PurchaseExtractor, PurchaseSources};
use super::process_payment::{ProcessPaymentCommand, ProcessPaymentHandler};
use super::reconciliation::{ReconciliationOutcome, MISSING_METADATA, SESSION_NOT_PAID};

/// Command carrying a completed checkout session.
#[derive(Debug, Clone)]
pub struct HandleCheckoutCompletedCommand {
    pub event_id: String,
    pub session: CheckoutSessionObject,
}

/// Credits the buyer of a paid checkout session, keyed on the session id.
pub struct HandleCheckoutCompletedHandler {
    extractor: PurchaseExtractor,
    process_payment: ProcessPaymentHandler,
}

impl HandleCheckoutCompletedHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            extractor: PurchaseExtractor::for_checkout(payment_provider),
            process_payment: ProcessPaymentHandler::new(ledger),
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleCheckoutCompletedCommand,
    ) -> Result<ReconciliationOutcome, WebhookError> {
        let session = &cmd.session;

        if !session.is_paid() {
            tracing::info!(
                event_id = %cmd.event_id,
                session_id = %session.id,
                payment_status = ?session.payment_status,
                "Checkout session not paid, skipping"
            );
            return Ok(ReconciliationOutcome::skipped(SESSION_NOT_PAID));
        }

        let claim = self
            .extractor
            .extract(PurchaseSources {
                session: Some(session),
                ..Default::default()
            })
            .await?;

        let Some(claim) = claim else {
            tracing::warn!(
                event_id = %cmd.event_id,
                event_type = "checkout.session.completed",
                session_id = %session.id,
                "Checkout session carries no usable purchase data"
            );
            return Ok(ReconciliationOutcome::skipped(MISSING_METADATA));
        };

        let source = PurchaseSource::Stripe(session.id.clone());
        let payment = self
            .process_payment
            .handle(ProcessPaymentCommand {
                claim: claim.clone(),
                source,
            })
            .await?;

        Ok(ReconciliationOutcome::Applied {
            user_id: claim.user_id,
            amount: claim.amount,
            source_event_id: session.id.clone(),
            payment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCreditLedger;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::foundation::UserId;
    use crate::ports::PaymentError;
    use serde_json::json;

    fn paid_session(id: &str) -> CheckoutSessionObject {
        CheckoutSessionObject {
            id: id.to_string(),
            payment_status: Some("paid".to_string()),
            metadata: json!({"userId": "resident-1", "packageId": "pkg_20", "creditsAmount": 20})
                .as_object()
                .cloned(),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<InMemoryCreditLedger>, MockPaymentProvider, HandleCheckoutCompletedHandler) {
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let provider = MockPaymentProvider::new();
        let handler = HandleCheckoutCompletedHandler::new(ledger.clone(), Arc::new(provider.clone()));
        (ledger, provider, handler)
    }

    fn cmd(session: CheckoutSessionObject) -> HandleCheckoutCompletedCommand {
        HandleCheckoutCompletedCommand {
            event_id: "evt_1".to_string(),
            session,
        }
    }

    #[tokio::test]
    async fn paid_session_with_metadata_is_credited() {
        let (ledger, _, handler) = setup();

        let outcome = handler.handle(cmd(paid_session("cs_1"))).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.new_balance(), Some(20));
        assert_eq!(
            ledger.peek_balance(&UserId::new("resident-1").unwrap()).await,
            Some(20)
        );
    }

    #[tokio::test]
    async fn unpaid_session_writes_nothing() {
        let (ledger, _, handler) = setup();
        let session = CheckoutSessionObject {
            payment_status: Some("unpaid".to_string()),
            ..paid_session("cs_1")
        };

        let outcome = handler.handle(cmd(session)).await.unwrap();

        assert_eq!(outcome.reason(), Some(SESSION_NOT_PAID));
        assert_eq!(ledger.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn session_without_any_source_reports_missing_metadata() {
        let (ledger, _, handler) = setup();
        let session = CheckoutSessionObject {
            id: "cs_bare".to_string(),
            payment_status: Some("paid".to_string()),
            ..Default::default()
        };

        let outcome = handler.handle(cmd(session)).await.unwrap();

        assert_eq!(outcome.reason(), Some(MISSING_METADATA));
        assert_eq!(ledger.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn client_reference_fallback_credits_line_item_total() {
        let (ledger, provider, handler) = setup();
        provider.set_line_items("cs_ref", vec![MockPaymentProvider::line_item(1000)]);
        let session = CheckoutSessionObject {
            id: "cs_ref".to_string(),
            payment_status: Some("paid".to_string()),
            metadata: Some(Default::default()),
            client_reference_id: Some("resident-2".to_string()),
            ..Default::default()
        };

        let outcome = handler.handle(cmd(session)).await.unwrap();

        assert_eq!(outcome.new_balance(), Some(10));
        let rows = ledger
            .transactions_for(&UserId::new("resident-2").unwrap())
            .await;
        assert_eq!(rows[0].amount, 10);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let (ledger, provider, handler) = setup();
        provider.set_method_error("list_line_items", PaymentError::network("down"));
        let session = CheckoutSessionObject {
            id: "cs_ref".to_string(),
            payment_status: Some("paid".to_string()),
            client_reference_id: Some("resident-2".to_string()),
            ..Default::default()
        };

        let err = handler.handle(cmd(session)).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(ledger.transaction_count().await, 0);
    }
}
