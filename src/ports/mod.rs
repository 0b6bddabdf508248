//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `CreditLedger` - Balances and the transaction log
//! - `CatalogReader` - Credit packages and action costs
//! - `ManualRequestRepository` - Administrator-reviewed credit requests
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Checkout sessions and reconciliation lookups

mod catalog_reader;
mod credit_ledger;
mod manual_request_repository;
mod payment_provider;

pub use catalog_reader::CatalogReader;
pub use credit_ledger::CreditLedger;
pub use manual_request_repository::ManualRequestRepository;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, LineItem, PaymentError, PaymentErrorCode,
    PaymentProvider,
};
