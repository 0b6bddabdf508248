//! Integration tests for webhook reconciliation.
//!
//! Drives the application handlers end to end over the in-memory ledger,
//! catalog and manual request adapters with a scripted Stripe provider:
//! 1. Duplicate and cross-event deliveries credit once
//! 2. Acknowledged outcomes (not paid, missing metadata) write nothing
//! 3. Spends and purchases share one balance row
//! 4. Signature verification gates the payload

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use condo_credits::adapters::memory::{InMemoryCreditLedger, InMemoryManualRequests};
use condo_credits::adapters::stripe::MockPaymentProvider;
use condo_credits::application::handlers::credits::{
    CatalogHandle, CreateManualRequestCommand, CreateManualRequestHandler, ProcessPaymentCommand,
    ProcessPaymentHandler, ReconciliationOutcome, ReviewDecision, ReviewManualRequestCommand,
    ReviewManualRequestHandler, RouteProviderEventHandler, SpendCreditsCommand,
    SpendCreditsHandler, MISSING_METADATA, SESSION_NOT_PAID,
};
use condo_credits::domain::credits::{
    parse_event, CatalogSnapshot, CheckoutSessionObject, CreditCost, CreditTransaction,
    CreditsError, InsertOutcome, NewTransaction, ProviderEvent, PurchaseClaim, PurchaseRecord,
    PurchaseSource, StripeWebhookVerifier, TransactionKind, WebhookError, WebhookVerification,
};
use condo_credits::domain::foundation::{DomainError, PackageId, UserId};
use condo_credits::ports::{CreditLedger, PaymentError, PaymentProvider};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "whsec_integration";

fn resident() -> UserId {
    UserId::new("resident-1").unwrap()
}

struct World {
    ledger: Arc<InMemoryCreditLedger>,
    provider: MockPaymentProvider,
    router: RouteProviderEventHandler,
}

fn world() -> World {
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let provider = MockPaymentProvider::new();
    let router = RouteProviderEventHandler::new(ledger.clone(), Arc::new(provider.clone()));
    World {
        ledger,
        provider,
        router,
    }
}

fn event(id: &str, event_type: &str, object: Value) -> ProviderEvent {
    let body = json!({"id": id, "type": event_type, "data": {"object": object}}).to_string();
    parse_event(body.as_bytes()).unwrap().classify().unwrap()
}

fn paid_session(session_id: &str) -> Value {
    json!({
        "id": session_id,
        "payment_status": "paid",
        "payment_intent": "pi_1",
        "metadata": {"userId": "resident-1", "packageId": "pkg_20", "creditsAmount": "20"}
    })
}

fn sign(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn sum(transactions: &[CreditTransaction]) -> i64 {
    transactions.iter().map(|t| t.amount).sum()
}

/// Ledger whose idempotency read never sees prior rows, as when two
/// deliveries of the same event pass the read check concurrently.
struct RacingLedger {
    inner: Arc<InMemoryCreditLedger>,
}

#[async_trait]
impl CreditLedger for RacingLedger {
    async fn get_balance(&self, user_id: &UserId) -> Result<i64, DomainError> {
        self.inner.get_balance(user_id).await
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertOutcome, DomainError> {
        self.inner.insert_transaction(tx).await
    }

    async fn record_purchase(&self, tx: NewTransaction) -> Result<PurchaseRecord, DomainError> {
        self.inner.record_purchase(tx).await
    }

    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64, DomainError> {
        self.inner.adjust_balance(user_id, delta).await
    }

    async fn debit_if_sufficient(
        &self,
        user_id: &UserId,
        amount: i64,
    ) -> Result<Option<i64>, DomainError> {
        self.inner.debit_if_sufficient(user_id, amount).await
    }

    async fn find_transaction_by_description(
        &self,
        _user_id: &UserId,
        _description: &str,
    ) -> Result<Option<CreditTransaction>, DomainError> {
        Ok(None)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError> {
        self.inner.list_transactions(user_id, limit, offset).await
    }
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn duplicate_checkout_delivery_credits_once() {
    let w = world();
    let delivery = event("evt_1", "checkout.session.completed", paid_session("cs_1"));

    let first = w.router.handle(delivery.clone()).await.unwrap();
    let second = w.router.handle(delivery).await.unwrap();

    let first = first.outcome.unwrap();
    let second = second.outcome.unwrap();
    assert!(!first.already_processed());
    assert!(second.already_processed());
    assert_eq!(second.new_balance(), Some(20));

    let rows = w.ledger.transactions_for(&resident()).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(w.ledger.peek_balance(&resident()).await, Some(20));
}

#[tokio::test]
async fn payment_intent_after_checkout_is_deduplicated() {
    let w = world();
    let session: CheckoutSessionObject = serde_json::from_value(paid_session("cs_1")).unwrap();
    w.provider.add_session_for_intent("pi_1", session);

    w.router
        .handle(event("evt_1", "checkout.session.completed", paid_session("cs_1")))
        .await
        .unwrap();
    let routed = w
        .router
        .handle(event(
            "evt_2",
            "payment_intent.succeeded",
            json!({
                "id": "pi_1",
                "amount_received": 1999,
                "metadata": {"userId": "resident-1", "packageId": "pkg_20", "creditsAmount": "20"}
            }),
        ))
        .await
        .unwrap();

    let outcome = routed.outcome.unwrap();
    assert!(outcome.already_processed());
    assert_eq!(w.ledger.transaction_count().await, 1);
    assert_eq!(w.ledger.peek_balance(&resident()).await, Some(20));
}

fn intent_with_metadata() -> Value {
    json!({
        "id": "pi_1",
        "amount_received": 2000,
        "metadata": {"userId": "resident-1", "packageId": "pkg_20", "creditsAmount": "20"}
    })
}

#[tokio::test]
async fn checkout_after_payment_intent_is_deduplicated() {
    let w = world();
    let session: CheckoutSessionObject = serde_json::from_value(paid_session("cs_1")).unwrap();
    w.provider.add_session_for_intent("pi_1", session);

    let first = w
        .router
        .handle(event("evt_1", "payment_intent.succeeded", intent_with_metadata()))
        .await
        .unwrap();
    let second = w
        .router
        .handle(event("evt_2", "checkout.session.completed", paid_session("cs_1")))
        .await
        .unwrap();

    assert!(!first.outcome.unwrap().already_processed());
    assert!(second.outcome.unwrap().already_processed());

    let rows = w.ledger.transactions_for(&resident()).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source_event_id.as_deref(), Some("cs_1"));
    assert_eq!(w.ledger.peek_balance(&resident()).await, Some(20));
}

#[tokio::test]
async fn failed_session_lookup_defers_intent_until_retry() {
    let w = world();
    let session: CheckoutSessionObject = serde_json::from_value(paid_session("cs_1")).unwrap();
    w.provider.add_session_for_intent("pi_1", session);
    w.provider.set_method_error(
        "find_sessions_by_payment_intent",
        PaymentError::network("connection reset"),
    );

    let err = w
        .router
        .handle(event("evt_1", "payment_intent.succeeded", intent_with_metadata()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(w.ledger.transaction_count().await, 0);

    w.router
        .handle(event("evt_2", "checkout.session.completed", paid_session("cs_1")))
        .await
        .unwrap();

    w.provider.clear_errors();
    let retried = w
        .router
        .handle(event("evt_1", "payment_intent.succeeded", intent_with_metadata()))
        .await
        .unwrap();

    assert!(retried.outcome.unwrap().already_processed());
    assert_eq!(w.ledger.transaction_count().await, 1);
    assert_eq!(w.ledger.peek_balance(&resident()).await, Some(20));
}

#[tokio::test]
async fn failed_credit_is_applied_on_redelivery() {
    let w = world();
    let delivery = event("evt_1", "checkout.session.completed", paid_session("cs_1"));

    w.ledger.set_fail_balance_updates(true);
    let err = w.router.handle(delivery.clone()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(w.ledger.transaction_count().await, 0);

    w.ledger.set_fail_balance_updates(false);
    let routed = w.router.handle(delivery).await.unwrap();

    assert!(!routed.outcome.unwrap().already_processed());
    assert_eq!(w.ledger.transaction_count().await, 1);
    assert_eq!(w.ledger.peek_balance(&resident()).await, Some(20));
}

#[tokio::test]
async fn concurrent_duplicates_past_the_read_check_credit_once() {
    let inner = Arc::new(InMemoryCreditLedger::new());
    let racing: Arc<dyn CreditLedger> = Arc::new(RacingLedger {
        inner: inner.clone(),
    });
    let handler = Arc::new(ProcessPaymentHandler::new(racing));

    let command = || ProcessPaymentCommand {
        claim: PurchaseClaim::new(resident(), Some(PackageId::new("pkg_20").unwrap()), 20).unwrap(),
        source: PurchaseSource::Stripe("cs_race".to_string()),
    };

    let (a, b) = tokio::join!(handler.handle(command()), handler.handle(command()));
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| o.already_processed()).count(), 1);
    assert_eq!(inner.transaction_count().await, 1);
    assert_eq!(inner.peek_balance(&resident()).await, Some(20));
}

// =============================================================================
// Acknowledged outcomes
// =============================================================================

#[tokio::test]
async fn unpaid_session_writes_nothing() {
    let w = world();
    let mut session = paid_session("cs_unpaid");
    session["payment_status"] = json!("unpaid");

    let routed = w
        .router
        .handle(event("evt_1", "checkout.session.completed", session))
        .await
        .unwrap();

    let outcome = routed.outcome.unwrap();
    assert!(!outcome.is_success());
    assert_eq!(outcome.reason(), Some(SESSION_NOT_PAID));
    assert_eq!(w.ledger.transaction_count().await, 0);
    assert_eq!(w.ledger.peek_balance(&resident()).await, None);
}

#[tokio::test]
async fn client_reference_and_line_items_fill_missing_metadata() {
    let w = world();
    w.provider
        .set_line_items("cs_ref", vec![MockPaymentProvider::line_item(1000)]);

    let routed = w
        .router
        .handle(event(
            "evt_1",
            "checkout.session.completed",
            json!({
                "id": "cs_ref",
                "payment_status": "paid",
                "metadata": {},
                "client_reference_id": "resident-1"
            }),
        ))
        .await
        .unwrap();

    match routed.outcome.unwrap() {
        ReconciliationOutcome::Applied { amount, .. } => assert_eq!(amount, 10),
        other => panic!("expected a credit, got {:?}", other),
    }
    let rows = w.ledger.transactions_for(&resident()).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount, 10);
}

#[tokio::test]
async fn session_without_any_purchase_data_writes_nothing() {
    let w = world();

    let routed = w
        .router
        .handle(event(
            "evt_1",
            "checkout.session.completed",
            json!({"id": "cs_empty", "payment_status": "paid"}),
        ))
        .await
        .unwrap();

    assert_eq!(routed.outcome.unwrap().reason(), Some(MISSING_METADATA));
    assert_eq!(w.ledger.transaction_count().await, 0);
}

#[tokio::test]
async fn refund_event_is_not_processed() {
    let w = world();

    let routed = w
        .router
        .handle(event("evt_1", "charge.refunded", json!({"id": "ch_1"})))
        .await
        .unwrap();

    assert!(!routed.handled);
    assert!(routed.outcome.is_none());
    assert_eq!(w.ledger.transaction_count().await, 0);
}

#[tokio::test]
async fn line_item_lookup_failure_is_retryable() {
    let w = world();
    w.provider.set_method_error(
        "list_line_items",
        PaymentError::network("connection reset"),
    );

    let err = w
        .router
        .handle(event(
            "evt_1",
            "checkout.session.completed",
            json!({"id": "cs_ref", "payment_status": "paid", "client_reference_id": "resident-1"}),
        ))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(w.ledger.transaction_count().await, 0);
}

// =============================================================================
// Shared balance row
// =============================================================================

fn catalog_with_cost(action: &str, cost: i64) -> CatalogHandle {
    CatalogHandle::fixed(CatalogSnapshot::new(
        vec![],
        vec![CreditCost {
            id: Uuid::new_v4(),
            action_type: action.to_string(),
            cost,
            description: None,
        }],
        Utc::now(),
    ))
}

#[tokio::test]
async fn purchase_then_spend_nets_out_on_one_balance() {
    let w = world();
    w.ledger.seed_balance(&resident(), 5).await;

    w.router
        .handle(event("evt_1", "checkout.session.completed", paid_session("cs_1")))
        .await
        .unwrap();

    let spend = SpendCreditsHandler::new(w.ledger.clone(), catalog_with_cost("create_ad", 7));
    let result = spend
        .handle(SpendCreditsCommand {
            user_id: resident(),
            action_type: "create_ad".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.new_balance, 18);
    let rows = w.ledger.transactions_for(&resident()).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(sum(&rows), 13);
    assert_eq!(rows[1].kind, TransactionKind::Spend);
}

#[tokio::test]
async fn unaffordable_spend_changes_nothing() {
    let ledger = Arc::new(InMemoryCreditLedger::new());
    ledger.seed_balance(&resident(), 3).await;
    let catalog = catalog_with_cost("create_ad", 10);
    assert!(!catalog.current().can_afford(3, "create_ad"));

    let err = SpendCreditsHandler::new(ledger.clone(), catalog)
        .handle(SpendCreditsCommand {
            user_id: resident(),
            action_type: "create_ad".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err, CreditsError::insufficient(3, 10));
    assert_eq!(ledger.peek_balance(&resident()).await, Some(3));
    assert_eq!(ledger.transaction_count().await, 0);
}

// =============================================================================
// Manual requests
// =============================================================================

#[tokio::test]
async fn manual_approval_credits_once_and_blocks_rejection() {
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let requests = Arc::new(InMemoryManualRequests::new());

    let created = CreateManualRequestHandler::new(requests.clone())
        .handle(CreateManualRequestCommand {
            user_id: resident(),
            amount: 40,
            payment_method: "bank_transfer".to_string(),
            payment_details: Some("ref 1234".to_string()),
        })
        .await
        .unwrap();

    let review = ReviewManualRequestHandler::new(requests.clone(), ledger.clone());
    let approve = || ReviewManualRequestCommand {
        request_id: created.id,
        decision: ReviewDecision::Approve,
    };

    let first = review.handle(approve()).await.unwrap();
    let second = review.handle(approve()).await.unwrap();
    assert!(!first.payment.unwrap().already_processed());
    assert!(second.payment.unwrap().already_processed());
    assert_eq!(ledger.peek_balance(&resident()).await, Some(40));
    assert_eq!(ledger.transaction_count().await, 1);

    let rejected = review
        .handle(ReviewManualRequestCommand {
            request_id: created.id,
            decision: ReviewDecision::Reject,
        })
        .await;
    assert!(matches!(rejected, Err(CreditsError::RequestNotPending { .. })));
}

#[tokio::test]
async fn rejected_request_cannot_be_approved() {
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let requests = Arc::new(InMemoryManualRequests::new());

    let created = CreateManualRequestHandler::new(requests.clone())
        .handle(CreateManualRequestCommand {
            user_id: resident(),
            amount: 40,
            payment_method: "cash".to_string(),
            payment_details: None,
        })
        .await
        .unwrap();

    let review = ReviewManualRequestHandler::new(requests, ledger.clone());
    review
        .handle(ReviewManualRequestCommand {
            request_id: created.id,
            decision: ReviewDecision::Reject,
        })
        .await
        .unwrap();

    let approved = review
        .handle(ReviewManualRequestCommand {
            request_id: created.id,
            decision: ReviewDecision::Approve,
        })
        .await;

    assert!(matches!(approved, Err(CreditsError::RequestNotPending { .. })));
    assert_eq!(ledger.transaction_count().await, 0);
}

// =============================================================================
// Signature verification
// =============================================================================

fn signed_payload() -> String {
    json!({"id": "evt_sig", "type": "checkout.session.completed", "data": {"object": paid_session("cs_sig")}})
        .to_string()
}

#[test]
fn valid_signature_is_accepted() {
    let payload = signed_payload();
    let now = Utc::now().timestamp();
    let verifier = StripeWebhookVerifier::new(SECRET);

    let event = verifier
        .verify_and_parse_at(payload.as_bytes(), &sign(&payload, now), now)
        .unwrap();

    assert_eq!(event.id, "evt_sig");
}

#[test]
fn tampered_payload_is_rejected() {
    let payload = signed_payload();
    let now = Utc::now().timestamp();
    let header = sign(&payload, now);
    let tampered = payload.replace("\"20\"", "\"2000\"");

    let err = StripeWebhookVerifier::new(SECRET)
        .verify_and_parse_at(tampered.as_bytes(), &header, now)
        .unwrap_err();

    assert!(matches!(err, WebhookError::InvalidSignature));
}

#[test]
fn stale_signature_is_rejected() {
    let payload = signed_payload();
    let now = Utc::now().timestamp();
    let header = sign(&payload, now - 301);

    let err = StripeWebhookVerifier::new(SECRET)
        .verify_and_parse_at(payload.as_bytes(), &header, now)
        .unwrap_err();

    assert!(matches!(err, WebhookError::TimestampOutOfRange));
}

#[test]
fn strict_mode_rejects_unsigned_payloads() {
    let strict = WebhookVerification::from_settings(Some(SECRET), false).unwrap();

    let err = strict
        .authenticate(signed_payload().as_bytes(), None)
        .unwrap_err();

    assert!(matches!(err, WebhookError::MissingSignature));
}

#[test]
fn relaxed_mode_parses_unsigned_payloads() {
    let relaxed = WebhookVerification::from_settings(None, true).unwrap();

    let event = relaxed
        .authenticate(signed_payload().as_bytes(), None)
        .unwrap();

    assert_eq!(event.id, "evt_sig");
}

#[test]
fn strict_mode_requires_a_secret() {
    assert!(WebhookVerification::from_settings(None, false).is_none());
}

#[tokio::test]
async fn provider_port_is_usable_as_trait_object() {
    let provider: Arc<dyn PaymentProvider> = Arc::new(MockPaymentProvider::new());
    assert!(provider.list_line_items("cs_none").await.unwrap().is_empty());
}
