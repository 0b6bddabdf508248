//! PostgreSQL adapters - Database implementations for the ledger ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresCreditLedger` - Balances and the transaction log
//! - `PostgresCatalogReader` - Credit packages and action costs
//! - `PostgresManualRequestRepository` - Manual credit requests
//!
//! The schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod catalog_reader;
mod credit_ledger;
mod manual_request_repository;

pub use catalog_reader::PostgresCatalogReader;
pub use credit_ledger::PostgresCreditLedger;
pub use manual_request_repository::PostgresManualRequestRepository;
