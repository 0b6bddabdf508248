//! Webhook error types for Stripe webhook handling.
//!
//! Defines the conditions that abort webhook processing, with HTTP status
//! code mapping and retryability semantics. Outcomes that are acknowledged
//! without a ledger write (unpaid session, missing metadata, unsupported
//! type) are not errors and live in the handler outcome types instead.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No `Stripe-Signature` header was sent.
    #[error("Missing signature")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Datastore operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Provider lookup (line items, sessions) failed.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl WebhookError {
    /// Returns true if Stripe should retry delivering this webhook.
    ///
    /// Retries are safe because every ledger write is keyed on the
    /// source event id.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::Provider(_))
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine Stripe's retry behavior:
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            WebhookError::MissingSignature
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            WebhookError::Database(_) | WebhookError::Provider(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ProviderError => WebhookError::Provider(err.message),
            _ => WebhookError::Database(err.to_string()),
        }
    }
}
