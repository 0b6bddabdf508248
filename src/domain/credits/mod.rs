//! Credits domain module.
//!
//! Credit purchases reconciled from Stripe webhooks, spends against the
//! action catalog, and manually approved top-ups.
//!
//! # Module Structure
//!
//! - `provider_event` - Stripe event envelope and the classified event union
//! - `webhook_verifier` - Signature verification and the strict/relaxed policy
//! - `normalizer` - Purchase claims read from metadata and URLs
//! - `ledger` - Transactions, purchase sources and mutation outcomes
//! - `catalog` - Packages, action costs and the snapshot resolver
//! - `manual_request` - Administrator-reviewed credit requests

mod catalog;
mod errors;
mod ledger;
mod manual_request;
mod normalizer;
mod provider_event;
mod webhook_errors;
mod webhook_verifier;

pub use catalog::{CatalogSnapshot, CreditCost, CreditPackage};
pub use errors::{CheckoutFailureKind, CreditsError};
pub use ledger::{
    CreditTransaction, InsertOutcome, NewTransaction, PaymentOutcome, PurchaseRecord,
    PurchaseSource, TransactionKind, MANUAL_SOURCE_PREFIX,
};
pub use manual_request::{ManualCreditRequest, ManualRequestStatus};
pub use normalizer::{
    claim_from_metadata, minor_units_to_credits, package_from_success_url, parse_credit_amount,
    user_from_metadata, PurchaseClaim,
};
pub use provider_event::{
    CheckoutSessionObject, Metadata, PaymentIntentObject, ProviderEvent, StripeEvent,
    StripeEventData, StripeEventType,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{parse_event, SignatureHeader, StripeWebhookVerifier, WebhookVerification};

#[cfg(test)]
pub use provider_event::StripeEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
