//! Outcome shared by the webhook event handlers.

use crate::domain::credits::PaymentOutcome;
use crate::domain::foundation::UserId;

pub const SESSION_NOT_PAID: &str = "Session not paid";
pub const MISSING_METADATA: &str = "Missing required metadata";
pub const NO_METADATA_FOR_INTENT: &str = "Could not find or construct metadata";

/// What a supported event did to the ledger.
///
/// `Skipped` is an acknowledged outcome, not an error: Stripe gets a 2xx and
/// stops retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Applied {
        user_id: UserId,
        amount: i64,
        source_event_id: String,
        payment: PaymentOutcome,
    },
    Skipped { reason: &'static str },
}

impl ReconciliationOutcome {
    pub fn skipped(reason: &'static str) -> Self {
        ReconciliationOutcome::Skipped { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReconciliationOutcome::Applied { .. })
    }

    pub fn new_balance(&self) -> Option<i64> {
        match self {
            ReconciliationOutcome::Applied { payment, .. } => Some(payment.new_balance()),
            ReconciliationOutcome::Skipped { .. } => None,
        }
    }

    pub fn already_processed(&self) -> bool {
        match self {
            ReconciliationOutcome::Applied { payment, .. } => payment.already_processed(),
            ReconciliationOutcome::Skipped { .. } => false,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ReconciliationOutcome::Skipped { reason } => Some(reason),
            ReconciliationOutcome::Applied { .. } => None,
        }
    }
}
