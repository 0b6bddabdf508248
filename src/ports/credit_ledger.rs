//! CreditLedger port - balances and the append-only transaction log.
//!
//! Three invariants are delegated to the datastore:
//!
//! - `source_event_id` is unique, so concurrent deliveries of the same
//!   external event cannot both append a purchase.
//! - A purchase row and its balance credit commit together or not at all,
//!   so a redelivery after a failure finds neither.
//! - Balance changes are single atomic statements; debits only apply when
//!   the row still covers the amount.
//!
//! Stripe may deliver the same webhook multiple times, so every caller that
//! records a purchase MUST tolerate `PurchaseRecord::Conflict`.

use async_trait::async_trait;

use crate::domain::credits::{CreditTransaction, InsertOutcome, NewTransaction, PurchaseRecord};
use crate::domain::foundation::{DomainError, UserId};

/// Port for the per-user credit ledger.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance, creating a zero row when the user has none.
    async fn get_balance(&self, user_id: &UserId) -> Result<i64, DomainError>;

    /// Append a transaction.
    ///
    /// Uses `ON CONFLICT (source_event_id) DO NOTHING` semantics: returns
    /// `InsertOutcome::Conflict` when another row owns the same source.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertOutcome, DomainError>;

    /// Append a purchase and add its amount to the balance in one unit.
    ///
    /// Returns `PurchaseRecord::Conflict` without touching the balance when
    /// another row owns the same source. On error nothing is written.
    async fn record_purchase(&self, tx: NewTransaction) -> Result<PurchaseRecord, DomainError>;

    /// Atomically add `delta` (may be negative) and return the new balance.
    ///
    /// Creates the balance row when missing.
    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64, DomainError>;

    /// Atomically subtract `amount` only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when funds were insufficient.
    async fn debit_if_sufficient(
        &self,
        user_id: &UserId,
        amount: i64,
    ) -> Result<Option<i64>, DomainError>;

    /// Find a user's transaction by exact description.
    async fn find_transaction_by_description(
        &self,
        user_id: &UserId,
        description: &str,
    ) -> Result<Option<CreditTransaction>, DomainError>;

    /// A user's transactions, newest first.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn CreditLedger) {}
    }
}
