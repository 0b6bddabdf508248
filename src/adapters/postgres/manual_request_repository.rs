//! PostgreSQL implementation of ManualRequestRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::credits::{ManualCreditRequest, ManualRequestStatus};
use crate::domain::foundation::{DomainError, ErrorCode, ManualRequestId, UserId};
use crate::ports::ManualRequestRepository;

pub struct PostgresManualRequestRepository {
    pool: PgPool,
}

impl PostgresManualRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ManualRequestRow {
    id: Uuid,
    user_id: String,
    amount: i64,
    payment_method: String,
    payment_details: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ManualRequestRow> for ManualCreditRequest {
    type Error = DomainError;

    fn try_from(row: ManualRequestRow) -> Result<Self, Self::Error> {
        let status = ManualRequestStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", row.status),
            )
        })?;

        Ok(ManualCreditRequest {
            id: ManualRequestId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            amount: row.amount,
            payment_method: row.payment_method,
            payment_details: row.payment_details,
            status,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
        })
    }
}

#[async_trait]
impl ManualRequestRepository for PostgresManualRequestRepository {
    async fn create(&self, request: &ManualCreditRequest) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO manual_credit_requests (
                id, user_id, amount, payment_method, payment_details, status, created_at, reviewed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.user_id.as_str())
        .bind(request.amount)
        .bind(&request.payment_method)
        .bind(&request.payment_details)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.reviewed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("manual_credit_requests_pkey") {
                    return DomainError::new(
                        ErrorCode::Conflict,
                        format!("Credit request {} already exists", request.id),
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save credit request: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ManualRequestId,
    ) -> Result<Option<ManualCreditRequest>, DomainError> {
        let row: Option<ManualRequestRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, amount, payment_method, payment_details, status, created_at, reviewed_at
            FROM manual_credit_requests
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find credit request: {}", e),
            )
        })?;

        row.map(ManualCreditRequest::try_from).transpose()
    }

    async fn list_by_status(
        &self,
        status: ManualRequestStatus,
    ) -> Result<Vec<ManualCreditRequest>, DomainError> {
        let rows: Vec<ManualRequestRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, amount, payment_method, payment_details, status, created_at, reviewed_at
            FROM manual_credit_requests
            WHERE status = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list credit requests: {}", e),
            )
        })?;

        rows.into_iter().map(ManualCreditRequest::try_from).collect()
    }

    async fn transition(
        &self,
        id: &ManualRequestId,
        from: ManualRequestStatus,
        to: ManualRequestStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE manual_credit_requests
            SET status = $3, reviewed_at = $4
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(reviewed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update credit request: {}", e),
            )
        })?;

        Ok(result.rows_affected() == 1)
    }
}
