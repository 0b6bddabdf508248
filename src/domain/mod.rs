//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors)
//! - `credits` - Credit purchases, spends, catalog and manual requests

pub mod credits;
pub mod foundation;
