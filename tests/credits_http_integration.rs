//! Integration tests for the credits HTTP surface.
//!
//! These tests build the public router over in-memory adapters and verify:
//! 1. Webhook status codes and acknowledgement bodies
//! 2. Resident endpoints (balance, history, spend, checkout)
//! 3. Validation and error bodies

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;
use uuid::Uuid;

use condo_credits::adapters::http::{credits_router, CreditsAppState};
use condo_credits::adapters::memory::{InMemoryCreditLedger, InMemoryManualRequests};
use condo_credits::adapters::stripe::MockPaymentProvider;
use condo_credits::application::handlers::credits::{CatalogHandle, CheckoutUrls};
use condo_credits::domain::credits::{
    CatalogSnapshot, CreditCost, CreditPackage, WebhookVerification,
};
use condo_credits::domain::foundation::{PackageId, UserId};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "whsec_http_integration";

struct App {
    router: Router,
    ledger: Arc<InMemoryCreditLedger>,
    provider: MockPaymentProvider,
}

fn catalog() -> CatalogHandle {
    CatalogHandle::fixed(CatalogSnapshot::new(
        vec![
            CreditPackage {
                id: PackageId::new("pkg_20").unwrap(),
                name: "Starter".to_string(),
                credits: 20,
                price: 19.99,
                active: true,
            },
            CreditPackage {
                id: PackageId::new("pkg_legacy").unwrap(),
                name: "Legacy".to_string(),
                credits: 5,
                price: 4.0,
                active: false,
            },
        ],
        vec![CreditCost {
            id: Uuid::new_v4(),
            action_type: "create_ad".to_string(),
            cost: 7,
            description: Some("Publish a listing".to_string()),
        }],
        Utc::now(),
    ))
}

fn app(verification: WebhookVerification) -> App {
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let provider = MockPaymentProvider::new();
    let state = CreditsAppState {
        ledger: ledger.clone(),
        manual_requests: Arc::new(InMemoryManualRequests::new()),
        payment_provider: Arc::new(provider.clone()),
        catalog: catalog(),
        webhook_verification: verification,
        checkout_urls: CheckoutUrls {
            success_url: "https://condo.example/credits/success".to_string(),
            cancel_url: "https://condo.example/credits".to_string(),
        },
    };

    App {
        router: credits_router().with_state(state),
        ledger,
        provider,
    }
}

fn strict_app() -> App {
    app(WebhookVerification::from_settings(Some(SECRET), false).unwrap())
}

fn resident() -> UserId {
    UserId::new("resident-1").unwrap()
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn webhook(payload: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn sign(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn as_resident(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Id", "resident-1");
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn checkout_completed(event_id: &str, session: Value) -> String {
    json!({"id": event_id, "type": "checkout.session.completed", "data": {"object": session}})
        .to_string()
}

// =============================================================================
// Webhook
// =============================================================================

#[tokio::test]
async fn signed_delivery_is_acknowledged_with_result() {
    let app = strict_app();
    let payload = checkout_completed(
        "evt_http_1",
        json!({
            "id": "cs_http_1",
            "payment_status": "paid",
            "metadata": {"userId": "resident-1", "packageId": "pkg_20", "creditsAmount": 20}
        }),
    );

    let (status, body) = call(
        &app.router,
        webhook(&payload, Some(sign(&payload, Utc::now().timestamp()))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));
    assert_eq!(body["eventType"], json!("checkout.session.completed"));
    assert_eq!(body["eventId"], json!("evt_http_1"));
    assert_eq!(body["result"]["success"], json!(true));
    assert_eq!(body["result"]["amount"], json!(20));
    assert!(body["timestamp"].is_string());
    assert_eq!(app.ledger.peek_balance(&resident()).await, Some(20));
}

#[tokio::test]
async fn line_item_fallback_over_http() {
    let app = strict_app();
    app.provider
        .set_line_items("cs_http_ref", vec![MockPaymentProvider::line_item(1000)]);
    let payload = checkout_completed(
        "evt_http_2",
        json!({"id": "cs_http_ref", "payment_status": "paid", "client_reference_id": "resident-1"}),
    );

    let (status, body) = call(
        &app.router,
        webhook(&payload, Some(sign(&payload, Utc::now().timestamp()))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["amount"], json!(10));
    assert_eq!(app.ledger.peek_balance(&resident()).await, Some(10));
}

#[tokio::test]
async fn tampered_delivery_is_401() {
    let app = strict_app();
    let payload = checkout_completed(
        "evt_http_3",
        json!({"id": "cs_http_3", "payment_status": "paid", "client_reference_id": "resident-1"}),
    );
    let signature = sign(&payload, Utc::now().timestamp());
    let tampered = payload.replace("resident-1", "resident-2");

    let (status, body) = call(&app.router, webhook(&tampered, Some(signature))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"], json!("Invalid signature"));
    assert_eq!(app.ledger.transaction_count().await, 0);
}

#[tokio::test]
async fn malformed_body_in_relaxed_mode_is_400() {
    let app = app(WebhookVerification::from_settings(None, true).unwrap());

    let (status, body) = call(&app.router, webhook("{not json", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn relaxed_mode_processes_unsigned_delivery() {
    let app = app(WebhookVerification::from_settings(None, true).unwrap());
    let payload = checkout_completed(
        "evt_http_4",
        json!({
            "id": "cs_http_4",
            "payment_status": "paid",
            "metadata": {"userId": "resident-1", "creditsAmount": "5"}
        }),
    );

    let (status, body) = call(&app.router, webhook(&payload, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["newBalance"], json!(5));
}

#[tokio::test]
async fn datastore_failure_is_500_so_stripe_retries() {
    let app = strict_app();
    app.ledger.set_fail_inserts(true);
    let payload = checkout_completed(
        "evt_http_5",
        json!({
            "id": "cs_http_5",
            "payment_status": "paid",
            "metadata": {"userId": "resident-1", "creditsAmount": "5"}
        }),
    );

    let (status, body) = call(
        &app.router,
        webhook(&payload, Some(sign(&payload, Utc::now().timestamp()))),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Webhook processing failed"));
    assert_eq!(app.ledger.peek_balance(&resident()).await, None);
}

// =============================================================================
// Resident endpoints
// =============================================================================

#[tokio::test]
async fn transactions_are_listed_newest_first() {
    let app = strict_app();
    app.ledger.seed_balance(&resident(), 30).await;

    for _ in 0..2 {
        let (status, _) = call(
            &app.router,
            as_resident("POST", "/api/credits/spend", Some(json!({"actionType": "create_ad"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        &app.router,
        as_resident("GET", "/api/credits/transactions?limit=1", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], json!(1));
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["type"], json!("spend"));
    assert_eq!(transactions[0]["amount"], json!(-7));

    let (_, balance) = call(&app.router, as_resident("GET", "/api/credits/balance", None)).await;
    assert_eq!(balance["balance"], json!(16));
}

#[tokio::test]
async fn unknown_action_is_free() {
    let app = strict_app();
    app.ledger.seed_balance(&resident(), 2).await;

    let (status, body) = call(
        &app.router,
        as_resident("POST", "/api/credits/spend", Some(json!({"actionType": "view_listing"}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"newBalance": 2, "cost": 0}));
    assert_eq!(app.ledger.transaction_count().await, 0);
}

#[tokio::test]
async fn catalog_hides_inactive_packages() {
    let app = strict_app();

    let (_, body) = call(&app.router, as_resident("GET", "/api/credits/catalog", None)).await;

    let ids: Vec<&str> = body["packages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["pkg_20"]);
}

#[tokio::test]
async fn checkout_for_inactive_package_is_404() {
    let app = strict_app();

    let (status, body) = call(
        &app.router,
        as_resident("POST", "/api/credits/checkout", Some(json!({"packageId": "pkg_legacy"}))),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], json!("PACKAGE_NOT_FOUND"));
    assert!(!app.provider.was_called("create_checkout_session"));
}

#[tokio::test]
async fn checkout_success_url_carries_package() {
    let app = strict_app();

    let (status, _) = call(
        &app.router,
        as_resident("POST", "/api/credits/checkout", Some(json!({"packageId": "pkg_20"}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let request = &app.provider.checkout_requests()[0];
    assert!(request.success_url.contains("package_id=pkg_20"));
    assert!(request.success_url.contains("session_id={CHECKOUT_SESSION_ID}"));
}

#[tokio::test]
async fn manual_request_with_zero_amount_is_400() {
    let app = strict_app();

    let (status, body) = call(
        &app.router,
        as_resident(
            "POST",
            "/api/credits/manual-requests",
            Some(json!({"amount": 0, "paymentMethod": "cash"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], json!("VALIDATION_FAILED"));
}

#[tokio::test]
async fn unknown_manual_request_is_404() {
    let app = strict_app();
    let uri = format!("/api/admin/credit-requests/{}/approve", Uuid::new_v4());

    let (status, body) = call(&app.router, as_resident("POST", &uri, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], json!("REQUEST_NOT_FOUND"));
}
