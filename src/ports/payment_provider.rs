//! Payment provider port for external payment processing.
//!
//! Defines the contract for the card-payment gateway (Stripe): creating
//! checkout sessions for credit packages and the two lookups webhook
//! reconciliation needs when event metadata is incomplete.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::credits::{CheckoutFailureKind, CheckoutSessionObject};
use crate::domain::foundation::{DomainError, ErrorCode, PackageId, UserId};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a one-off payment checkout session for a credit package.
    ///
    /// Returns a URL for the buyer to complete payment.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Line items of a checkout session.
    ///
    /// An empty list is a valid answer (e.g. expanded items were purged).
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, PaymentError>;

    /// Checkout sessions backed by a payment intent. At most one is expected.
    async fn find_sessions_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<CheckoutSessionObject>, PaymentError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCheckoutRequest {
    /// Buyer; also sent as `client_reference_id`.
    pub user_id: UserId,

    pub package_id: PackageId,

    /// Credits granted once paid.
    pub credits: i64,

    /// Unit price in minor currency units.
    pub price_minor_units: i64,

    /// Product name shown on the hosted checkout page.
    pub name: String,

    /// Redirect after payment. Already carries `package_id`.
    pub success_url: String,

    /// Redirect after abandonment.
    pub cancel_url: String,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID.
    pub id: String,

    /// URL for the buyer to complete checkout.
    pub url: String,
}

/// A purchased line of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub quantity: Option<i64>,

    /// Line total in minor currency units.
    #[serde(default)]
    pub amount_total: i64,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the provider's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// Classifies the error for checkout failure reporting.
    pub fn failure_kind(&self) -> CheckoutFailureKind {
        match self.code {
            PaymentErrorCode::NetworkError => CheckoutFailureKind::Connectivity,
            PaymentErrorCode::Timeout => CheckoutFailureKind::Timeout,
            PaymentErrorCode::AuthenticationError
            | PaymentErrorCode::InvalidRequest
            | PaymentErrorCode::NotFound
            | PaymentErrorCode::RateLimitExceeded
            | PaymentErrorCode::ProviderError => CheckoutFailureKind::Provider,
            PaymentErrorCode::Unknown => CheckoutFailureKind::Generic,
        }
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let mut domain = DomainError::new(ErrorCode::ProviderError, err.message)
            .with_detail("payment_code", err.code.to_string());
        if let Some(provider_code) = err.provider_code {
            domain = domain.with_detail("provider_code", provider_code);
        }
        domain
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// No response within the configured timeout.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Request rejected as malformed by the provider.
    InvalidRequest,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
