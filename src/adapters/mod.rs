//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for residents, administrators and Stripe webhooks
//! - `postgres` - PostgreSQL ledger, catalog and manual request storage
//! - `stripe` - Stripe REST client and a scriptable mock
//! - `memory` - In-memory port implementations for tests and local runs

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
