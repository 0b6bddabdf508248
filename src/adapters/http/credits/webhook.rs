//! Stripe webhook endpoint.
//!
//! Stripe retries any non-2xx delivery, so the status code is the contract:
//! acknowledged outcomes (credited, already processed, not paid, missing
//! metadata) answer 200, unsupported types 202, rejected payloads 4xx and
//! datastore/provider failures 5xx.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use crate::domain::credits::WebhookError;

use super::dto::{WebhookAckResponse, WebhookErrorResponse};
use super::handlers::CreditsAppState;

const STRIPE_SIGNATURE: &str = "stripe-signature";

/// POST /api/webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<CreditsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|v| v.to_str().ok());

    let event = state
        .webhook_verification
        .authenticate(&body, signature)?
        .classify()?;

    let routed = state.event_router().handle(event).await?;

    let status = if routed.handled {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };

    if let Some(reason) = routed.outcome.as_ref().and_then(|o| o.reason()) {
        tracing::warn!(
            event_id = %routed.event_id,
            event_type = %routed.event_type,
            reason,
            "Webhook acknowledged without ledger change"
        );
    }

    let body = WebhookAckResponse::from_routed(&routed, Utc::now());
    Ok((status, Json(body)).into_response())
}

/// OPTIONS /api/webhooks/stripe
pub async fn webhook_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "content-type, stripe-signature",
            ),
        ],
    )
}

/// Webhook failure rendered as `{error, details, timestamp}`.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();

        let error = if status.is_server_error() {
            tracing::error!(
                error = %self.0,
                retryable = self.0.is_retryable(),
                "Webhook processing failed"
            );
            "Webhook processing failed"
        } else {
            tracing::warn!(error = %self.0, "Webhook rejected");
            "Webhook rejected"
        };

        let body = WebhookErrorResponse {
            error: error.to_string(),
            details: self.0.to_string(),
            timestamp: Utc::now(),
        };

        (status, Json(body)).into_response()
    }
}
