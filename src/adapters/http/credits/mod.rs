//! HTTP adapter for credit endpoints.
//!
//! Exposes the credit ledger via REST API:
//! - `GET /api/credits/balance` - Current balance
//! - `GET /api/credits/transactions` - Transaction history
//! - `GET /api/credits/catalog` - Active packages and action costs
//! - `POST /api/credits/spend` - Pay for a marketplace action
//! - `POST /api/credits/checkout` - Start a hosted checkout
//! - `POST /api/credits/manual-requests` - Request credits paid outside Stripe
//! - `GET /api/admin/credit-requests` - Pending manual requests
//! - `POST /api/admin/credit-requests/:id/{approve,reject}` - Review a request
//! - `POST /api/webhooks/stripe` - Handle Stripe webhooks
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod webhook;

pub use handlers::{AuthenticatedUser, CreditsApiError, CreditsAppState};
pub use routes::{api_router, credits_router, webhook_routes};
