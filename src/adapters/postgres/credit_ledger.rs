//! PostgreSQL implementation of CreditLedger.
//!
//! Atomicity comes from PostgreSQL: the balance upsert adds in place, the
//! conditional debit filters on the row it updates, and the `source_event_id`
//! unique constraint rejects the losing insert of a concurrent duplicate
//! delivery. `record_purchase` runs its insert and balance upsert in one
//! database transaction so a failed credit never leaves its purchase row
//! behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::credits::{
    CreditTransaction, InsertOutcome, NewTransaction, PurchaseRecord, TransactionKind,
};
use crate::domain::foundation::{DomainError, ErrorCode, PackageId, TransactionId, UserId};
use crate::ports::CreditLedger;

/// PostgreSQL implementation of the CreditLedger port.
pub struct PostgresCreditLedger {
    pool: PgPool,
}

impl PostgresCreditLedger {
    /// Creates a new PostgresCreditLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a credit transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    amount: i64,
    #[sqlx(rename = "type")]
    kind: String,
    description: String,
    package_id: Option<String>,
    source_event_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for CreditTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind = TransactionKind::parse(&row.kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid transaction type: {}", row.kind),
            )
        })?;

        Ok(CreditTransaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            amount: row.amount,
            kind,
            description: row.description,
            // blank package ids from older rows are treated as absent
            package_id: row.package_id.and_then(|p| PackageId::new(p).ok()),
            source_event_id: row.source_event_id,
            created_at: row.created_at,
        })
    }
}

const INSERT_TRANSACTION: &str = r#"
    INSERT INTO credit_transactions (
        id, user_id, amount, type, description, package_id, source_event_id, created_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
    ON CONFLICT ON CONSTRAINT credit_transactions_source_event_id_key DO NOTHING
    RETURNING id
"#;

const ADD_TO_BALANCE: &str = r#"
    INSERT INTO user_credits (user_id, balance, updated_at)
    VALUES ($1, $2, NOW())
    ON CONFLICT (user_id) DO UPDATE
        SET balance = user_credits.balance + EXCLUDED.balance,
            updated_at = NOW()
    RETURNING balance
"#;

const SELECT_BALANCE: &str = "SELECT balance FROM user_credits WHERE user_id = $1";

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl CreditLedger for PostgresCreditLedger {
    async fn get_balance(&self, user_id: &UserId) -> Result<i64, DomainError> {
        let existing: Option<i64> = sqlx::query_scalar(SELECT_BALANCE)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("read balance", e))?;
        if let Some(balance) = existing {
            return Ok(balance);
        }

        // first touch; a concurrent creator may win, the re-read sees either row
        sqlx::query(
            r#"
            INSERT INTO user_credits (user_id, balance, updated_at)
            VALUES ($1, 0, NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create balance", e))?;

        sqlx::query_scalar(SELECT_BALANCE)
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("read balance", e))
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertOutcome, DomainError> {
        let id = TransactionId::new();

        let inserted: Option<Uuid> = sqlx::query_scalar(INSERT_TRANSACTION)
            .bind(id.as_uuid())
            .bind(tx.user_id.as_str())
            .bind(tx.amount)
            .bind(tx.kind.as_str())
            .bind(&tx.description)
            .bind(tx.package_id.as_ref().map(PackageId::as_str))
            .bind(&tx.source_event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("insert credit transaction", e))?;

        Ok(match inserted {
            Some(uuid) => InsertOutcome::Inserted(TransactionId::from_uuid(uuid)),
            None => InsertOutcome::Conflict,
        })
    }

    async fn record_purchase(&self, tx: NewTransaction) -> Result<PurchaseRecord, DomainError> {
        let id = TransactionId::new();
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let inserted: Option<Uuid> = sqlx::query_scalar(INSERT_TRANSACTION)
            .bind(id.as_uuid())
            .bind(tx.user_id.as_str())
            .bind(tx.amount)
            .bind(tx.kind.as_str())
            .bind(&tx.description)
            .bind(tx.package_id.as_ref().map(PackageId::as_str))
            .bind(&tx.source_event_id)
            .fetch_optional(&mut *db_tx)
            .await
            .map_err(|e| db_error("insert purchase", e))?;

        // dropping db_tx rolls back
        let Some(uuid) = inserted else {
            return Ok(PurchaseRecord::Conflict);
        };

        let new_balance: i64 = sqlx::query_scalar(ADD_TO_BALANCE)
            .bind(tx.user_id.as_str())
            .bind(tx.amount)
            .fetch_one(&mut *db_tx)
            .await
            .map_err(|e| db_error("credit balance", e))?;

        db_tx
            .commit()
            .await
            .map_err(|e| db_error("commit purchase", e))?;

        Ok(PurchaseRecord::Recorded {
            transaction_id: TransactionId::from_uuid(uuid),
            new_balance,
        })
    }

    async fn adjust_balance(&self, user_id: &UserId, delta: i64) -> Result<i64, DomainError> {
        let balance: i64 = sqlx::query_scalar(ADD_TO_BALANCE)
            .bind(user_id.as_str())
            .bind(delta)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("adjust balance", e))?;

        Ok(balance)
    }

    async fn debit_if_sufficient(
        &self,
        user_id: &UserId,
        amount: i64,
    ) -> Result<Option<i64>, DomainError> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE user_credits
            SET balance = balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id.as_str())
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("debit balance", e))?;

        Ok(balance)
    }

    async fn find_transaction_by_description(
        &self,
        user_id: &UserId,
        description: &str,
    ) -> Result<Option<CreditTransaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, amount, type, description, package_id, source_event_id, created_at
            FROM credit_transactions
            WHERE user_id = $1 AND description = $2
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find credit transaction", e))?;

        row.map(CreditTransaction::try_from).transpose()
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, amount, type, description, package_id, source_event_id, created_at
            FROM credit_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list credit transactions", e))?;

        rows.into_iter().map(CreditTransaction::try_from).collect()
    }
}
