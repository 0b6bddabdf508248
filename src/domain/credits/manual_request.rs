//! Manual credit requests - offline payments reviewed by an administrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ManualRequestId, UserId, ValidationError};

use super::ledger::PurchaseSource;

/// Review state of a manual request.
///
/// Only `Pending` may transition, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl ManualRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManualRequestStatus::Pending => "pending",
            ManualRequestStatus::Approved => "approved",
            ManualRequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ManualRequestStatus::Pending),
            "approved" => Some(ManualRequestStatus::Approved),
            "rejected" => Some(ManualRequestStatus::Rejected),
            _ => None,
        }
    }

    /// Whether `self -> target` is a legal review transition.
    pub fn can_transition_to(&self, target: ManualRequestStatus) -> bool {
        *self == ManualRequestStatus::Pending && target != ManualRequestStatus::Pending
    }
}

impl std::fmt::Display for ManualRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's request for credits paid outside Stripe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCreditRequest {
    pub id: ManualRequestId,
    pub user_id: UserId,
    pub amount: i64,
    pub payment_method: String,
    pub payment_details: Option<String>,
    pub status: ManualRequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ManualCreditRequest {
    /// Creates a pending request.
    ///
    /// # Errors
    ///
    /// `NotPositive` for amounts below one credit, `EmptyField` for a blank
    /// payment method.
    pub fn new(
        user_id: UserId,
        amount: i64,
        payment_method: impl Into<String>,
        payment_details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::not_positive("amount", amount));
        }
        let payment_method = payment_method.into();
        if payment_method.trim().is_empty() {
            return Err(ValidationError::empty_field("payment_method"));
        }

        Ok(Self {
            id: ManualRequestId::new(),
            user_id,
            amount,
            payment_method: payment_method.trim().to_string(),
            payment_details: payment_details.filter(|d| !d.trim().is_empty()),
            status: ManualRequestStatus::Pending,
            created_at: now,
            reviewed_at: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == ManualRequestStatus::Pending
    }

    /// Ledger source used when this request is approved.
    pub fn source(&self) -> PurchaseSource {
        PurchaseSource::Manual(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("resident-7").unwrap()
    }

    #[test]
    fn new_request_is_pending() {
        let req = ManualCreditRequest::new(user(), 30, "bank_transfer", None, Utc::now()).unwrap();

        assert!(req.is_pending());
        assert!(req.reviewed_at.is_none());
        assert_eq!(req.payment_method, "bank_transfer");
    }

    #[test]
    fn rejects_non_positive_amount() {
        let err = ManualCreditRequest::new(user(), 0, "cash", None, Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::not_positive("amount", 0));
    }

    #[test]
    fn rejects_blank_payment_method() {
        let err = ManualCreditRequest::new(user(), 5, "  ", None, Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::empty_field("payment_method"));
    }

    #[test]
    fn blank_details_are_dropped() {
        let req =
            ManualCreditRequest::new(user(), 5, "cash", Some(" ".to_string()), Utc::now()).unwrap();
        assert!(req.payment_details.is_none());
    }

    #[test]
    fn source_uses_manual_prefix() {
        let req = ManualCreditRequest::new(user(), 5, "cash", None, Utc::now()).unwrap();
        assert_eq!(req.source().source_event_id(), format!("manual:{}", req.id));
    }

    #[test]
    fn only_pending_can_transition() {
        use ManualRequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
    }

    #[test]
    fn status_parses_round_trip() {
        for status in [
            ManualRequestStatus::Pending,
            ManualRequestStatus::Approved,
            ManualRequestStatus::Rejected,
        ] {
            assert_eq!(ManualRequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ManualRequestStatus::parse("cancelled"), None);
    }
}
