//! Axum router configuration for credit endpoints.
//!
//! This module defines the route structure for credit-related API endpoints
//! and wires them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    approve_request, create_checkout, create_manual_request, get_balance, get_catalog, health,
    list_pending_requests, list_transactions, reject_request, spend_credits, CreditsAppState,
};
use super::webhook::{handle_stripe_webhook, webhook_preflight};

/// Resident-facing credit routes, mounted at `/api/credits`.
///
/// # Routes
/// - `GET /balance` - Current balance
/// - `GET /transactions` - Transaction history, newest first
/// - `GET /catalog` - Active packages and action costs
/// - `POST /spend` - Pay for a marketplace action
/// - `POST /checkout` - Start a hosted checkout for a package
/// - `POST /manual-requests` - Request credits paid outside Stripe
pub fn credit_routes() -> Router<CreditsAppState> {
    Router::new()
        .route("/balance", get(get_balance))
        .route("/transactions", get(list_transactions))
        .route("/catalog", get(get_catalog))
        .route("/spend", post(spend_credits))
        .route("/checkout", post(create_checkout))
        .route("/manual-requests", post(create_manual_request))
}

/// Administrator routes, mounted at `/api/admin/credit-requests`.
pub fn admin_routes() -> Router<CreditsAppState> {
    Router::new()
        .route("/", get(list_pending_requests))
        .route("/:id/approve", post(approve_request))
        .route("/:id/reject", post(reject_request))
}

/// Stripe webhook routes, mounted at `/api/webhooks`.
///
/// Kept apart from the API routes because Stripe is authenticated by
/// signature and answers its own CORS preflight. Methods other than POST and
/// OPTIONS get 405 from the method router.
pub fn webhook_routes() -> Router<CreditsAppState> {
    Router::new().route(
        "/stripe",
        post(handle_stripe_webhook).options(webhook_preflight),
    )
}

/// API routes that sit behind the browser CORS policy.
pub fn api_router() -> Router<CreditsAppState> {
    Router::new()
        .nest("/api/credits", credit_routes())
        .nest("/api/admin/credit-requests", admin_routes())
}

/// The complete service router, before middleware.
///
/// # Example
///
/// ```ignore
/// let app = credits_router().with_state(state);
/// axum::serve(listener, app).await?;
/// ```
pub fn credits_router() -> Router<CreditsAppState> {
    Router::new()
        .merge(api_router())
        .nest("/api/webhooks", webhook_routes())
        .route("/health", get(health))
}
