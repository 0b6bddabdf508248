//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API:
//! payment-mode checkout sessions for credit packages, and the line-item and
//! session lookups used to reconstruct purchases from incomplete webhooks.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_timeout(Duration::from_secs(15));
//! let adapter = StripePaymentAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::PaymentConfig;
use crate::domain::credits::CheckoutSessionObject;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, LineItem, PaymentError, PaymentErrorCode,
    PaymentProvider,
};

use super::api_types::{StripeCreatedSession, StripeErrorBody, StripeLineItem, StripeList, StripeSessionList};

/// Stripe caps list pages at 100.
const LIST_PAGE_LIMIT: &str = "100";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Timeout applied to every outbound request.
    timeout: Duration,

    /// Currency of credit package prices.
    currency: String,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            timeout: Duration::from_secs(15),
            currency: "usd".to_string(),
        }
    }

    /// Build from the application payment settings.
    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self::new(config.stripe_api_key.clone())
            .with_base_url(config.api_base_url.clone())
            .with_timeout(config.request_timeout())
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built (TLS backend unavailable).
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::new(PaymentErrorCode::Unknown, e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Form parameters for a one-off credit package checkout.
    fn checkout_params(&self, request: &CreateCheckoutRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("client_reference_id", request.user_id.to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[userId]", request.user_id.to_string()),
            ("metadata[packageId]", request.package_id.to_string()),
            ("metadata[creditsAmount]", request.credits.to_string()),
            ("payment_intent_data[metadata][userId]", request.user_id.to_string()),
            ("payment_intent_data[metadata][packageId]", request.package_id.to_string()),
            ("payment_intent_data[metadata][creditsAmount]", request.credits.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.config.currency.clone()),
            ("line_items[0][price_data][unit_amount]", request.price_minor_units.to_string()),
            ("line_items[0][price_data][product_data][name]", request.name.clone()),
        ]
    }

    async fn send(&self, builder: reqwest::RequestBuilder, operation: &str) -> Result<reqwest::Response, PaymentError> {
        let response = builder
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(operation, status = status.as_u16(), error = %error_text, "Stripe request failed");
            return Err(api_error(status, &error_text));
        }

        Ok(response)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }
}

/// Classifies a failure to reach Stripe.
fn transport_error(e: &reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(format!("Stripe request timed out: {}", e))
    } else if e.is_connect() || e.is_request() {
        PaymentError::network(format!("Could not reach Stripe: {}", e))
    } else {
        PaymentError::new(PaymentErrorCode::Unknown, e.to_string())
    }
}

/// Maps a non-2xx Stripe response to a `PaymentError`.
fn api_error(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        400 | 402 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            let error = PaymentError::new(code, format!("Stripe API error: {}", message));
            match parsed.error.code.or(parsed.error.error_type) {
                Some(provider_code) => error.with_provider_code(provider_code),
                None => error,
            }
        }
        Err(_) => PaymentError::new(code, format!("Stripe API error: {}", body)),
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = self.checkout_params(&request);
        let response = self
            .send(
                self.http_client
                    .post(self.url("/v1/checkout/sessions"))
                    .form(&params),
                "create_checkout_session",
            )
            .await?;

        let created: StripeCreatedSession = Self::parse(response).await?;
        created.into_checkout_session().ok_or_else(|| {
            PaymentError::provider("Stripe returned a checkout session without a URL")
        })
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, PaymentError> {
        let path = format!("/v1/checkout/sessions/{}/line_items", session_id);
        let response = self
            .send(
                self.http_client
                    .get(self.url(&path))
                    .query(&[("limit", LIST_PAGE_LIMIT)]),
                "list_line_items",
            )
            .await?;

        let list: StripeList<StripeLineItem> = Self::parse(response).await?;
        if list.has_more {
            tracing::warn!(session_id, "Checkout session has more than one page of line items");
        }
        Ok(list.data.into_iter().map(LineItem::from).collect())
    }

    async fn find_sessions_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<CheckoutSessionObject>, PaymentError> {
        let response = self
            .send(
                self.http_client
                    .get(self.url("/v1/checkout/sessions"))
                    .query(&[("payment_intent", payment_intent_id)]),
                "find_sessions_by_payment_intent",
            )
            .await?;

        let list: StripeSessionList = Self::parse(response).await?;
        Ok(list.data)
    }
}
