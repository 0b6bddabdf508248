//! Ledger entries, purchase sources and mutation outcomes.
//!
//! A credit transaction is append-only. Purchases carry the identifier of the
//! external event that caused them in two places: the `source_event_id`
//! column (unique) and a human-readable description that older rows were
//! deduplicated on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ManualRequestId, PackageId, TransactionId, UserId};

/// Prefix of source event ids produced by manual credit requests.
pub const MANUAL_SOURCE_PREFIX: &str = "manual:";

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Spend,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Spend => "spend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(TransactionKind::Purchase),
            "spend" => Some(TransactionKind::Spend),
            _ => None,
        }
    }
}

/// Where a purchase came from. Determines the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseSource {
    /// Stripe checkout session id, or payment intent id when no session exists.
    Stripe(String),
    /// Approved manual credit request.
    Manual(ManualRequestId),
}

impl PurchaseSource {
    /// Unique dedup key stored in `source_event_id`.
    pub fn source_event_id(&self) -> String {
        match self {
            PurchaseSource::Stripe(id) => id.clone(),
            PurchaseSource::Manual(id) => format!("{}{}", MANUAL_SOURCE_PREFIX, id),
        }
    }

    /// Description written on the purchase transaction.
    pub fn description(&self) -> String {
        match self {
            PurchaseSource::Stripe(id) => format!("Credit purchase via Stripe - id: {}", id),
            PurchaseSource::Manual(_) => format!(
                "Credit purchase via manual request - id: {}",
                self.source_event_id()
            ),
        }
    }
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    /// Positive for credits, negative for debits.
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub package_id: Option<PackageId>,
    pub source_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry waiting to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub package_id: Option<PackageId>,
    pub source_event_id: Option<String>,
}

impl NewTransaction {
    /// Purchase entry keyed on its source.
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        package_id: Option<PackageId>,
        source: &PurchaseSource,
    ) -> Self {
        Self {
            user_id,
            amount,
            kind: TransactionKind::Purchase,
            description: source.description(),
            package_id,
            source_event_id: Some(source.source_event_id()),
        }
    }

    /// Spend entry; stored with a negative amount.
    pub fn spend(user_id: UserId, cost: i64, action_type: &str) -> Self {
        Self {
            user_id,
            amount: -cost.abs(),
            kind: TransactionKind::Spend,
            description: format!("Credits spent on {}", action_type),
            package_id: None,
            source_event_id: None,
        }
    }

    /// Materializes the entry with a fresh id and timestamp.
    pub fn into_transaction(self, id: TransactionId, created_at: DateTime<Utc>) -> CreditTransaction {
        CreditTransaction {
            id,
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            description: self.description,
            package_id: self.package_id,
            source_event_id: self.source_event_id,
            created_at,
        }
    }
}

/// Result of appending a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written.
    Inserted(TransactionId),
    /// Another row already owns this `source_event_id`.
    Conflict,
}

/// Result of recording a purchase row together with its balance credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseRecord {
    /// Row written and balance incremented in the same unit of work.
    Recorded {
        transaction_id: TransactionId,
        new_balance: i64,
    },
    /// Another row already owns this `source_event_id`; nothing written.
    Conflict,
}

/// Result of the purchase mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Balance was incremented by this call.
    Credited {
        transaction_id: TransactionId,
        new_balance: i64,
    },
    /// The source was already applied; nothing written.
    AlreadyProcessed { new_balance: i64 },
}

impl PaymentOutcome {
    pub fn new_balance(&self) -> i64 {
        match self {
            PaymentOutcome::Credited { new_balance, .. }
            | PaymentOutcome::AlreadyProcessed { new_balance } => *new_balance,
        }
    }

    pub fn already_processed(&self) -> bool {
        matches!(self, PaymentOutcome::AlreadyProcessed { .. })
    }
}
