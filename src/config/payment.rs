//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Payment provider configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<String>,

    /// Accept webhooks whose signature is absent or does not verify.
    ///
    /// Development only; refused in production.
    #[serde(default)]
    pub allow_unsigned_webhooks: bool,

    /// Base URL of the Stripe REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for outbound provider calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Where the provider sends the buyer after a successful checkout
    #[serde(default = "default_success_url")]
    pub checkout_success_url: String,

    /// Where the provider sends the buyer after an abandoned checkout
    #[serde(default = "default_cancel_url")]
    pub checkout_cancel_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Outbound request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Webhook secret, ignoring blank values
    pub fn webhook_secret(&self) -> Option<&str> {
        self.stripe_webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }

        match self.webhook_secret() {
            Some(secret) if !secret.starts_with("whsec_") => {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
            Some(_) => {}
            None if !self.allow_unsigned_webhooks => {
                return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
            }
            None => {}
        }

        if *environment == Environment::Production && self.allow_unsigned_webhooks {
            return Err(ValidationError::UnsignedWebhooksInProduction);
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }

        url::Url::parse(&self.api_base_url)
            .map_err(|_| ValidationError::InvalidUrl("api_base_url"))?;
        url::Url::parse(&self.checkout_success_url)
            .map_err(|_| ValidationError::InvalidUrl("checkout_success_url"))?;
        url::Url::parse(&self.checkout_cancel_url)
            .map_err(|_| ValidationError::InvalidUrl("checkout_cancel_url"))?;

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: None,
            allow_unsigned_webhooks: false,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            checkout_success_url: default_success_url(),
            checkout_cancel_url: default_cancel_url(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_success_url() -> String {
    "http://localhost:5173/credits/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:5173/credits".to_string()
}
