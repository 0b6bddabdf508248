//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers own the ledger writes; query handlers only read.

pub mod handlers;

pub use handlers::credits::{
    // Webhook reconciliation
    ProcessPaymentCommand, ProcessPaymentHandler, ReconciliationOutcome,
    RouteProviderEventHandler, RoutedEvent,
    // Catalog
    CatalogHandle, CatalogRefresher,
    // Commands
    CreateCheckoutCommand, CreateCheckoutHandler, CreateManualRequestCommand,
    CreateManualRequestHandler, ReviewDecision, ReviewManualRequestCommand,
    ReviewManualRequestHandler, SpendCreditsCommand, SpendCreditsHandler,
};
