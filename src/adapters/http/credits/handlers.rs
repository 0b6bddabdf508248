//! HTTP handlers for credit endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Json, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::credits::{
    CatalogHandle, CheckoutUrls, CreateCheckoutCommand, CreateCheckoutHandler,
    CreateManualRequestCommand, CreateManualRequestHandler, GetBalanceHandler, GetBalanceQuery,
    ListPendingRequestsHandler, ListTransactionsHandler, ListTransactionsQuery, ReviewDecision,
    ReviewManualRequestCommand, ReviewManualRequestHandler, RouteProviderEventHandler,
    SpendCreditsCommand, SpendCreditsHandler, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::domain::credits::{CreditsError, WebhookVerification};
use crate::domain::foundation::{DomainError, ManualRequestId, PackageId, UserId};
use crate::ports::{CreditLedger, ManualRequestRepository, PaymentProvider};

use super::dto::{
    BalanceResponse, CatalogResponse, CheckoutErrorResponse, CheckoutResponse,
    CreateCheckoutRequest, CreateManualRequestRequest, ErrorResponse, ManualRequestsResponse,
    ReviewResponse, SpendCreditsRequest, SpendCreditsResponse, TransactionsParams,
    TransactionsResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc` or a watch
/// receiver.
#[derive(Clone)]
pub struct CreditsAppState {
    pub ledger: Arc<dyn CreditLedger>,
    pub manual_requests: Arc<dyn ManualRequestRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub catalog: CatalogHandle,
    pub webhook_verification: WebhookVerification,
    pub checkout_urls: CheckoutUrls,
}

impl CreditsAppState {
    pub fn balance_handler(&self) -> GetBalanceHandler {
        GetBalanceHandler::new(self.ledger.clone())
    }

    pub fn transactions_handler(&self) -> ListTransactionsHandler {
        ListTransactionsHandler::new(self.ledger.clone())
    }

    pub fn spend_handler(&self) -> SpendCreditsHandler {
        SpendCreditsHandler::new(self.ledger.clone(), self.catalog.clone())
    }

    pub fn checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.payment_provider.clone(),
            self.catalog.clone(),
            self.checkout_urls.clone(),
        )
    }

    pub fn create_manual_request_handler(&self) -> CreateManualRequestHandler {
        CreateManualRequestHandler::new(self.manual_requests.clone())
    }

    pub fn pending_requests_handler(&self) -> ListPendingRequestsHandler {
        ListPendingRequestsHandler::new(self.manual_requests.clone())
    }

    pub fn review_handler(&self) -> ReviewManualRequestHandler {
        ReviewManualRequestHandler::new(self.manual_requests.clone(), self.ledger.clone())
    }

    pub fn event_router(&self) -> RouteProviderEventHandler {
        RouteProviderEventHandler::new(self.ledger.clone(), self.payment_provider.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity.
///
/// Authentication lives in the gateway in front of this service, which
/// forwards the resident id as `X-User-Id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/credits/balance
pub async fn get_balance(
    State(state): State<CreditsAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, CreditsApiError> {
    let balance = state
        .balance_handler()
        .handle(GetBalanceQuery {
            user_id: user.user_id.clone(),
        })
        .await?;

    Ok(Json(BalanceResponse {
        user_id: user.user_id.to_string(),
        balance,
    }))
}

/// GET /api/credits/transactions?limit&offset
pub async fn list_transactions(
    State(state): State<CreditsAppState>,
    user: AuthenticatedUser,
    Query(params): Query<TransactionsParams>,
) -> Result<impl IntoResponse, CreditsApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let transactions = state
        .transactions_handler()
        .handle(ListTransactionsQuery {
            user_id: user.user_id,
            limit: Some(limit),
            offset: Some(offset),
        })
        .await?;

    Ok(Json(TransactionsResponse {
        transactions,
        limit,
        offset,
    }))
}

/// GET /api/credits/catalog
pub async fn get_catalog(State(state): State<CreditsAppState>) -> impl IntoResponse {
    let snapshot = state.catalog.current();
    Json(CatalogResponse::from(snapshot.as_ref()))
}

/// GET /api/admin/credit-requests
pub async fn list_pending_requests(
    State(state): State<CreditsAppState>,
    _admin: AuthenticatedUser, // role check happens in the gateway
) -> Result<impl IntoResponse, CreditsApiError> {
    let requests = state.pending_requests_handler().handle().await?;
    Ok(Json(ManualRequestsResponse { requests }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/credits/spend
pub async fn spend_credits(
    State(state): State<CreditsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<SpendCreditsRequest>,
) -> Result<impl IntoResponse, CreditsApiError> {
    let result = state
        .spend_handler()
        .handle(SpendCreditsCommand {
            user_id: user.user_id,
            action_type: request.action_type,
        })
        .await?;

    Ok(Json(SpendCreditsResponse {
        new_balance: result.new_balance,
        cost: result.cost,
    }))
}

/// POST /api/credits/checkout
pub async fn create_checkout(
    State(state): State<CreditsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, CreditsApiError> {
    let package_id = PackageId::new(request.package_id).map_err(CreditsError::from)?;

    let session = state
        .checkout_handler()
        .handle(CreateCheckoutCommand {
            user_id: user.user_id,
            package_id,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}

/// POST /api/credits/manual-requests
pub async fn create_manual_request(
    State(state): State<CreditsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateManualRequestRequest>,
) -> Result<impl IntoResponse, CreditsApiError> {
    let created = state
        .create_manual_request_handler()
        .handle(CreateManualRequestCommand {
            user_id: user.user_id,
            amount: request.amount,
            payment_method: request.payment_method,
            payment_details: request.payment_details,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/admin/credit-requests/:id/approve
pub async fn approve_request(
    state: State<CreditsAppState>,
    admin: AuthenticatedUser,
    path: Path<String>,
) -> Result<impl IntoResponse, CreditsApiError> {
    review_request(state, admin, path, ReviewDecision::Approve).await
}

/// POST /api/admin/credit-requests/:id/reject
pub async fn reject_request(
    state: State<CreditsAppState>,
    admin: AuthenticatedUser,
    path: Path<String>,
) -> Result<impl IntoResponse, CreditsApiError> {
    review_request(state, admin, path, ReviewDecision::Reject).await
}

async fn review_request(
    State(state): State<CreditsAppState>,
    admin: AuthenticatedUser,
    Path(id): Path<String>,
    decision: ReviewDecision,
) -> Result<Json<ReviewResponse>, CreditsApiError> {
    let request_id: ManualRequestId = id
        .parse()
        .map_err(|_| CreditsError::validation("id", "Request id must be a UUID"))?;

    tracing::info!(
        request_id = %request_id,
        reviewer = %admin.user_id,
        decision = ?decision,
        "Reviewing manual credit request"
    );

    let result = state
        .review_handler()
        .handle(ReviewManualRequestCommand {
            request_id,
            decision,
        })
        .await?;

    Ok(Json(ReviewResponse::new(result.request, result.payment)))
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct CreditsApiError(CreditsError);

impl From<CreditsError> for CreditsApiError {
    fn from(err: CreditsError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for CreditsApiError {
    fn from(err: DomainError) -> Self {
        Self(CreditsError::from(err))
    }
}

impl IntoResponse for CreditsApiError {
    fn into_response(self) -> Response {
        let message = self.0.message();

        let (status, body) = match &self.0 {
            CreditsError::InsufficientCredits { balance, cost } => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorResponse::with_details(
                    "INSUFFICIENT_CREDITS",
                    message,
                    serde_json::json!({"balance": balance, "cost": cost}),
                ),
            ),
            CreditsError::UnknownPackage(_) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("PACKAGE_NOT_FOUND", message),
            ),
            CreditsError::RequestNotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("REQUEST_NOT_FOUND", message),
            ),
            CreditsError::RequestNotPending { status, .. } => (
                StatusCode::CONFLICT,
                ErrorResponse::with_details(
                    "REQUEST_NOT_PENDING",
                    message,
                    serde_json::json!({"status": status}),
                ),
            ),
            CreditsError::ValidationFailed { field, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details(
                    "VALIDATION_FAILED",
                    message,
                    serde_json::json!({"field": field}),
                ),
            ),
            CreditsError::CheckoutFailed { kind, .. } => {
                let body = CheckoutErrorResponse {
                    error: message,
                    kind: *kind,
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
            CreditsError::Infrastructure(_) => {
                tracing::error!(error = %message, "Credit request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", message),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
