//! Credit handlers.
//!
//! Command and query handlers for the credit ledger including:
//!
//! ## Webhook Reconciliation
//! - Routing classified Stripe events
//! - Crediting completed checkout sessions and succeeded payment intents
//! - The single purchase write path (`ProcessPaymentHandler`)
//!
//! ## Commands
//! - Spending credits on marketplace actions
//! - Starting a checkout for a credit package
//! - Creating and reviewing manual credit requests
//!
//! ## Queries
//! - Balance, transaction history and pending manual requests
//!
//! ## Catalog
//! - `CatalogRefresher` publishes the package/cost snapshot read by spends
//!   and checkouts

mod catalog_snapshot;
mod create_checkout;
mod create_manual_request;
mod extract_purchase;
mod get_balance;
mod handle_checkout_completed;
mod handle_payment_intent;
mod list_pending_requests;
mod list_transactions;
mod process_payment;
mod reconciliation;
mod review_manual_request;
mod route_provider_event;
mod spend_credits;

pub use catalog_snapshot::{CatalogHandle, CatalogRefresher};
pub use extract_purchase::{PurchaseExtractor, PurchaseSources, PurchaseStrategy};
pub use reconciliation::{
    ReconciliationOutcome, MISSING_METADATA, NO_METADATA_FOR_INTENT, SESSION_NOT_PAID,
};

// Webhook reconciliation
pub use handle_checkout_completed::{HandleCheckoutCompletedCommand, HandleCheckoutCompletedHandler};
pub use handle_payment_intent::{HandlePaymentIntentCommand, HandlePaymentIntentHandler};
pub use process_payment::{ProcessPaymentCommand, ProcessPaymentHandler};
pub use route_provider_event::{RouteProviderEventHandler, RoutedEvent};

// Commands
pub use create_checkout::{CheckoutUrls, CreateCheckoutCommand, CreateCheckoutHandler};
pub use create_manual_request::{CreateManualRequestCommand, CreateManualRequestHandler};
pub use review_manual_request::{
    ReviewDecision, ReviewManualRequestCommand, ReviewManualRequestHandler,
    ReviewManualRequestResult,
};
pub use spend_credits::{SpendCreditsCommand, SpendCreditsHandler, SpendCreditsResult};

// Queries
pub use get_balance::{GetBalanceHandler, GetBalanceQuery};
pub use list_pending_requests::ListPendingRequestsHandler;
pub use list_transactions::{
    ListTransactionsHandler, ListTransactionsQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
