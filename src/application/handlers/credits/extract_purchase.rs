//! Ordered purchase-extraction strategies.
//!
//! Stripe events do not always carry the metadata set at checkout creation.
//! The extractor tries each strategy in order and the first one that yields
//! a claim wins. Strategies that cannot apply return `Ok(None)`; only a
//! failed provider lookup is an error.

use std::sync::Arc;

use crate::domain::credits::{
    claim_from_metadata, minor_units_to_credits, package_from_success_url, CheckoutSessionObject,
    PaymentIntentObject, PurchaseClaim, WebhookError,
};
use crate::domain::foundation::UserId;
use crate::ports::PaymentProvider;

/// A single way of reading a purchase out of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStrategy {
    /// Metadata attached to the payment intent.
    IntentMetadata,
    /// Metadata attached to the checkout session.
    SessionMetadata,
    /// `client_reference_id` plus line-item totals.
    ClientReference,
}

/// What an event makes available to the strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseSources<'a> {
    pub intent: Option<&'a PaymentIntentObject>,
    pub session: Option<&'a CheckoutSessionObject>,
}

/// Runs strategies in order against the provider.
pub struct PurchaseExtractor {
    payment_provider: Arc<dyn PaymentProvider>,
    strategies: Vec<PurchaseStrategy>,
}

impl PurchaseExtractor {
    /// Chain for `checkout.session.completed`.
    pub fn for_checkout(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self::new(
            payment_provider,
            vec![
                PurchaseStrategy::SessionMetadata,
                PurchaseStrategy::ClientReference,
            ],
        )
    }

    /// Chain for `payment_intent.succeeded`.
    pub fn for_payment_intent(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self::new(
            payment_provider,
            vec![
                PurchaseStrategy::IntentMetadata,
                PurchaseStrategy::SessionMetadata,
                PurchaseStrategy::ClientReference,
            ],
        )
    }

    pub fn new(payment_provider: Arc<dyn PaymentProvider>, strategies: Vec<PurchaseStrategy>) -> Self {
        Self {
            payment_provider,
            strategies,
        }
    }

    pub fn strategies(&self) -> &[PurchaseStrategy] {
        &self.strategies
    }

    /// First claim produced by the chain.
    ///
    /// # Errors
    ///
    /// `WebhookError::Provider` when the line-item lookup fails.
    pub async fn extract(
        &self,
        sources: PurchaseSources<'_>,
    ) -> Result<Option<PurchaseClaim>, WebhookError> {
        for strategy in &self.strategies {
            if let Some(claim) = self.apply(*strategy, sources).await? {
                tracing::debug!(strategy = ?strategy, user_id = %claim.user_id, "Purchase extracted");
                return Ok(Some(claim));
            }
        }
        Ok(None)
    }

    async fn apply(
        &self,
        strategy: PurchaseStrategy,
        sources: PurchaseSources<'_>,
    ) -> Result<Option<PurchaseClaim>, WebhookError> {
        let session_package = sources
            .session
            .and_then(|s| s.success_url.as_deref())
            .and_then(package_from_success_url);

        match strategy {
            PurchaseStrategy::IntentMetadata => Ok(sources
                .intent
                .and_then(PaymentIntentObject::metadata)
                .and_then(claim_from_metadata)
                .map(|claim| claim.or_package(session_package))),

            PurchaseStrategy::SessionMetadata => Ok(sources
                .session
                .and_then(CheckoutSessionObject::metadata)
                .and_then(claim_from_metadata)
                .map(|claim| claim.or_package(session_package))),

            PurchaseStrategy::ClientReference => {
                let Some(session) = sources.session else {
                    return Ok(None);
                };
                let Some(user_id) = session.client_reference().and_then(|r| UserId::new(r).ok())
                else {
                    return Ok(None);
                };

                let minor_units = self.session_total(session).await?;
                Ok(PurchaseClaim::new(
                    user_id,
                    session_package,
                    minor_units_to_credits(minor_units),
                ))
            }
        }
    }

    /// Line-item total, falling back to the session total when Stripe
    /// returns no items.
    async fn session_total(&self, session: &CheckoutSessionObject) -> Result<i64, WebhookError> {
        let items = self
            .payment_provider
            .list_line_items(&session.id)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session.id, error = %e, "Line item lookup failed");
                WebhookError::Provider(e.to_string())
            })?;

        if items.is_empty() {
            return Ok(session.amount_total.unwrap_or(0));
        }
        Ok(items.iter().map(|item| item.amount_total).sum())
    }
}
