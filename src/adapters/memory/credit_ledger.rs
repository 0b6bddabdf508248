//! In-memory credit ledger.
//!
//! Holds balances and transactions behind a single lock so that every port
//! method is atomic, mirroring the single-statement guarantees of the
//! PostgreSQL adapter. Enforces `source_event_id` uniqueness the same way the
//! database constraint does.
//!
//! Intended for tests and local development without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::credits::{CreditTransaction, InsertOutcome, NewTransaction, PurchaseRecord};
use crate::domain::foundation::{DomainError, TransactionId, UserId};
use crate::ports::CreditLedger;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<UserId, i64>,
    /// Append order is creation order.
    transactions: Vec<CreditTransaction>,
}

/// In-memory implementation of the `CreditLedger` port.
///
/// # Example
///
/// ```ignore
/// let ledger = InMemoryCreditLedger::new();
/// ledger.seed_balance(&user, 5).await;
/// assert_eq!(ledger.get_balance(&user).await?, 5);
/// ```
#[derive(Default)]
pub struct InMemoryCreditLedger {
    state: RwLock<LedgerState>,
    fail_inserts: AtomicBool,
    fail_balance_reads: AtomicBool,
    fail_balance_updates: AtomicBool,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Sets a balance directly, without a transaction row.
    pub async fn seed_balance(&self, user_id: &UserId, balance: i64) {
        self.state
            .write()
            .await
            .balances
            .insert(user_id.clone(), balance);
    }

    /// All transactions of a user, oldest first.
    pub async fn transactions_for(&self, user_id: &UserId) -> Vec<CreditTransaction> {
        self.state
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Total number of transactions across users.
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Balance without creating a row; `None` when the user has none.
    pub async fn peek_balance(&self, user_id: &UserId) -> Option<i64> {
        self.state.read().await.balances.get(user_id).copied()
    }

    /// Make `insert_transaction` fail with a database error.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make `get_balance` fail with a database error.
    pub fn set_fail_balance_reads(&self, fail: bool) {
        self.fail_balance_reads.store(fail, Ordering::SeqCst);
    }

    /// Make balance increments (`adjust_balance`, `record_purchase`) fail
    /// with a database error.
    pub fn set_fail_balance_updates(&self, fail: bool) {
        self.fail_balance_updates.store(fail, Ordering::SeqCst);
    }
}

fn source_taken(state: &LedgerState, tx: &NewTransaction) -> bool {
    match &tx.source_event_id {
        Some(source) => state
            .transactions
            .iter()
            .any(|t| t.source_event_id.as_ref() == Some(source)),
        None => false,
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn get_balance(&self, user_id: &UserId) -> Result<i64, DomainError> {
        if self.fail_balance_reads.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated balance read failure"));
        }
        let mut state = self.state.write().await;
        Ok(*state.balances.entry(user_id.clone()).or_insert(0))
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertOutcome, DomainError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated insert failure"));
        }
        let mut state = self.state.write().await;
        if source_taken(&state, &tx) {
            return Ok(InsertOutcome::Conflict);
        }

        let id = TransactionId::new();
        state.transactions.push(tx.into_transaction(id, Utc::now()));
        Ok(InsertOutcome::Inserted(id))
    }

    async fn record_purchase(&self, tx: NewTransaction) -> Result<PurchaseRecord, DomainError> {
        let mut state = self.state.write().await;
        if source_taken(&state, &tx) {
            return Ok(PurchaseRecord::Conflict);
        }
        // checked before any write so a failure leaves no partial purchase
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated insert failure"));
        }
        if self.fail_balance_updates.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated balance update failure"));
        }

        let id = TransactionId::new();
        let user_id = tx.user_id.clone();
        let amount = tx.amount;
        state.transactions.push(tx.into_transaction(id, Utc::now()));

        let balance = state.balances.entry(user_id).or_insert(0);
        *balance += amount;
        Ok(PurchaseRecord::Recorded {
            transaction_id: id,
            new_balance: *balance,
        })
    }

    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64, DomainError> {
        if self.fail_balance_updates.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated balance update failure"));
        }
        let mut state = self.state.write().await;
        let balance = state.balances.entry(user_id.clone()).or_insert(0);
        *balance += delta;
        Ok(*balance)
    }

    async fn debit_if_sufficient(
        &self,
        user_id: &UserId,
        amount: i64,
    ) -> Result<Option<i64>, DomainError> {
        let mut state = self.state.write().await;
        match state.balances.get_mut(user_id) {
            Some(balance) if *balance >= amount => {
                *balance -= amount;
                Ok(Some(*balance))
            }
            _ => Ok(None),
        }
    }

    async fn find_transaction_by_description(
        &self,
        user_id: &UserId,
        description: &str,
    ) -> Result<Option<CreditTransaction>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .find(|t| &t.user_id == user_id && t.description == description)
            .cloned())
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| &t.user_id == user_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
