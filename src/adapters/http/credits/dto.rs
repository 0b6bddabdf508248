//! HTTP DTOs (Data Transfer Objects) for credit endpoints.
//!
//! These types define the JSON request/response structure for the credits API
//! and the Stripe webhook acknowledgement. Field names are camelCase to match
//! the marketplace frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::handlers::credits::{ReconciliationOutcome, RoutedEvent};
use crate::domain::credits::{
    CatalogSnapshot, CheckoutFailureKind, CreditCost, CreditPackage, CreditTransaction,
    ManualCreditRequest, PaymentOutcome,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to pay for a marketplace action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendCreditsRequest {
    pub action_type: String,
}

/// Request to start a hosted checkout.
///
/// Older clients also send `amount`, `price` and `name`; those are ignored in
/// favour of the catalog entry for `packageId`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub package_id: String,
}

/// Request for credits paid outside Stripe.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManualRequestRequest {
    pub amount: i64,
    pub payment_method: String,
    #[serde(default)]
    pub payment_details: Option<String>,
}

/// Paging parameters for the transaction history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<CreditTransaction>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendCreditsResponse {
    pub new_balance: i64,
    pub cost: i64,
}

/// Active packages and action costs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub packages: Vec<CreditPackage>,
    pub costs: Vec<CreditCost>,
    /// When the snapshot was loaded; absent until the first refresh succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl From<&CatalogSnapshot> for CatalogResponse {
    fn from(snapshot: &CatalogSnapshot) -> Self {
        Self {
            packages: snapshot.active_packages().into_iter().cloned().collect(),
            costs: snapshot.costs().into_iter().cloned().collect(),
            loaded_at: snapshot.loaded_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualRequestsResponse {
    pub requests: Vec<ManualCreditRequest>,
}

/// Result of an approve/reject call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub request: ManualCreditRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
}

impl ReviewResponse {
    pub fn new(request: ManualCreditRequest, payment: Option<PaymentOutcome>) -> Self {
        Self {
            request,
            already_processed: payment.map(|p| p.already_processed()),
            new_balance: payment.map(|p| p.new_balance()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Per-event handler result embedded in the webhook acknowledgement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<String>,
}

impl From<&ReconciliationOutcome> for ReconciliationResult {
    fn from(outcome: &ReconciliationOutcome) -> Self {
        match outcome {
            ReconciliationOutcome::Applied {
                user_id,
                amount,
                source_event_id,
                payment,
            } => Self {
                success: true,
                reason: None,
                already_processed: Some(payment.already_processed()),
                new_balance: Some(payment.new_balance()),
                user_id: Some(user_id.to_string()),
                amount: Some(*amount),
                source_event_id: Some(source_event_id.clone()),
            },
            ReconciliationOutcome::Skipped { reason } => Self {
                success: false,
                reason: Some((*reason).to_string()),
                already_processed: None,
                new_balance: None,
                user_id: None,
                amount: None,
                source_event_id: None,
            },
        }
    }
}

/// Body returned to Stripe for every authenticated delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAckResponse {
    pub received: bool,
    pub message: String,
    pub event_type: String,
    pub event_id: String,
    pub result: Option<ReconciliationResult>,
    pub timestamp: DateTime<Utc>,
}

impl WebhookAckResponse {
    pub fn from_routed(routed: &RoutedEvent, now: DateTime<Utc>) -> Self {
        let message = if routed.handled {
            "Webhook processed".to_string()
        } else {
            format!("Event type {} not processed", routed.event_type)
        };

        Self {
            received: true,
            message,
            event_type: routed.event_type.clone(),
            event_id: routed.event_id.clone(),
            result: routed.outcome.as_ref().map(ReconciliationResult::from),
            timestamp: now,
        }
    }
}

/// Body returned when webhook processing fails.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookErrorResponse {
    pub error: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Checkout failures carry the failure class for the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutErrorResponse {
    pub error: String,
    pub kind: CheckoutFailureKind,
}
