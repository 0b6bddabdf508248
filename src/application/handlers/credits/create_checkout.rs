//! CreateCheckoutHandler - starts a Stripe checkout for a credit package.
//!
//! The session is created with everything webhook reconciliation reads
//! back later: `metadata[userId|packageId|creditsAmount]`, the buyer as
//! `client_reference_id`, and a success URL carrying `package_id`.

use std::sync::Arc;

use crate::domain::credits::CreditsError;
use crate::domain::foundation::{PackageId, UserId};
use crate::ports::{CheckoutSession, CreateCheckoutRequest, PaymentProvider};

use super::catalog_snapshot::CatalogHandle;

/// Stripe substitutes this placeholder with the session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Redirect targets for hosted checkout.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user_id: UserId,
    pub package_id: PackageId,
}

/// Handler for checkout initiation.
///
/// Credits, price and name come from the active catalog, never from the
/// client.
pub struct CreateCheckoutHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    catalog: CatalogHandle,
    urls: CheckoutUrls,
}

impl CreateCheckoutHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        catalog: CatalogHandle,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            payment_provider,
            catalog,
            urls,
        }
    }

    pub async fn handle(&self, cmd: CreateCheckoutCommand) -> Result<CheckoutSession, CreditsError> {
        let snapshot = self.catalog.current();
        let package = snapshot
            .active_package(&cmd.package_id)
            .ok_or_else(|| CreditsError::unknown_package(cmd.package_id.as_str()))?;

        let request = CreateCheckoutRequest {
            user_id: cmd.user_id.clone(),
            package_id: package.id.clone(),
            credits: package.credits,
            price_minor_units: package.price_minor_units(),
            name: package.name.clone(),
            success_url: success_url(&self.urls.success_url, &package.id),
            cancel_url: self.urls.cancel_url.clone(),
        };

        let session = self
            .payment_provider
            .create_checkout_session(request)
            .await
            .map_err(|e| {
                let kind = e.failure_kind();
                tracing::error!(
                    user_id = %cmd.user_id,
                    package_id = %cmd.package_id,
                    kind = kind.as_str(),
                    error = %e,
                    "Checkout session creation failed"
                );
                CreditsError::checkout_failed(kind, e.message)
            })?;

        tracing::info!(
            user_id = %cmd.user_id,
            package_id = %cmd.package_id,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(session)
    }
}

/// `{base}?session_id={CHECKOUT_SESSION_ID}&package_id=<id>`.
///
/// Built by hand because URL serializers would escape the placeholder braces.
fn success_url(base: &str, package_id: &PackageId) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    let package: String = url::form_urlencoded::byte_serialize(package_id.as_str().as_bytes()).collect();
    format!(
        "{}{}session_id={}&package_id={}",
        base, separator, SESSION_ID_PLACEHOLDER, package
    )
}
