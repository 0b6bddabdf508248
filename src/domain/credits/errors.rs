//! Credit-specific error types for user and admin operations.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InsufficientCredits | 402 |
//! | UnknownPackage | 404 |
//! | RequestNotFound | 404 |
//! | RequestNotPending | 409 |
//! | ValidationFailed | 400 |
//! | CheckoutFailed | 500 |
//! | Infrastructure | 500 |

use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode, ManualRequestId, ValidationError};

use super::manual_request::ManualRequestStatus;

/// Why a checkout session could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutFailureKind {
    /// Provider unreachable (DNS, TLS, connection refused).
    Connectivity,
    /// Provider did not answer within the request timeout.
    Timeout,
    /// Provider answered with an error body.
    Provider,
    Generic,
}

impl CheckoutFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutFailureKind::Connectivity => "connectivity",
            CheckoutFailureKind::Timeout => "timeout",
            CheckoutFailureKind::Provider => "provider",
            CheckoutFailureKind::Generic => "generic",
        }
    }
}

/// Credit ledger errors surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditsError {
    /// Balance does not cover the action cost.
    InsufficientCredits { balance: i64, cost: i64 },

    /// Package id is not in the active catalog.
    UnknownPackage(String),

    /// Manual request does not exist.
    RequestNotFound(ManualRequestId),

    /// Manual request was already reviewed.
    RequestNotPending {
        id: ManualRequestId,
        status: ManualRequestStatus,
    },

    /// Provider checkout session could not be created.
    CheckoutFailed {
        kind: CheckoutFailureKind,
        message: String,
    },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl CreditsError {
    pub fn insufficient(balance: i64, cost: i64) -> Self {
        CreditsError::InsufficientCredits { balance, cost }
    }

    pub fn unknown_package(id: impl Into<String>) -> Self {
        CreditsError::UnknownPackage(id.into())
    }

    pub fn not_pending(id: ManualRequestId, status: ManualRequestStatus) -> Self {
        CreditsError::RequestNotPending { id, status }
    }

    pub fn checkout_failed(kind: CheckoutFailureKind, message: impl Into<String>) -> Self {
        CreditsError::CheckoutFailed {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CreditsError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        CreditsError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CreditsError::InsufficientCredits { .. } => ErrorCode::InsufficientCredits,
            CreditsError::UnknownPackage(_) | CreditsError::RequestNotFound(_) => {
                ErrorCode::NotFound
            }
            CreditsError::RequestNotPending { .. } => ErrorCode::InvalidStateTransition,
            CreditsError::CheckoutFailed { .. } => ErrorCode::PaymentFailed,
            CreditsError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            CreditsError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            CreditsError::InsufficientCredits { balance, cost } => {
                format!("Insufficient credits: balance {} is below cost {}", balance, cost)
            }
            CreditsError::UnknownPackage(id) => format!("Credit package not found: {}", id),
            CreditsError::RequestNotFound(id) => format!("Credit request not found: {}", id),
            CreditsError::RequestNotPending { id, status } => {
                format!("Credit request {} is already {}", id, status)
            }
            CreditsError::CheckoutFailed { kind, message } => {
                format!("Checkout failed ({}): {}", kind.as_str(), message)
            }
            CreditsError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            CreditsError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for CreditsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CreditsError {}

impl From<DomainError> for CreditsError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => CreditsError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => CreditsError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for CreditsError {
    fn from(err: ValidationError) -> Self {
        CreditsError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<CreditsError> for DomainError {
    fn from(err: CreditsError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
