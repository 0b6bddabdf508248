//! In-memory adapters for tests and database-free local runs.
//!
//! Each adapter implements the same port as its PostgreSQL counterpart and
//! honors the same atomicity and uniqueness guarantees.

mod catalog;
mod credit_ledger;
mod manual_requests;

pub use catalog::InMemoryCatalog;
pub use credit_ledger::InMemoryCreditLedger;
pub use manual_requests::InMemoryManualRequests;
