//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration:
//! - Payment-mode checkout sessions for credit packages
//! - Line-item lookup for sessions created without metadata
//! - Session lookup by payment intent
//!
//! Webhook signature verification lives in the domain
//! (`domain::credits::webhook_verifier`) because it needs no I/O.
//!
//! # Configuration
//!
//! Read from the `payment` section of the application config:
//! - `CONDO_CREDITS__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `CONDO_CREDITS__PAYMENT__API_BASE_URL`: override for stripe-mock

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
