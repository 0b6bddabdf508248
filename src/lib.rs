//! Condo Credits - credit ledger for the condominium marketplace
//!
//! This crate reconciles Stripe payment webhooks into a per-user credit
//! ledger, and serves the spend, checkout and manual top-up flows that move
//! credits in and out of it.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
