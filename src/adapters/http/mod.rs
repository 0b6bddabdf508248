//! HTTP adapters - REST API implementations.

pub mod credits;

pub use credits::{credits_router, CreditsAppState};
