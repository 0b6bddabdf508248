//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `CONDO_CREDITS` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use condo_credits::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod catalog;
mod database;
mod error;
mod payment;
mod server;

pub use catalog::CatalogConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    /// Catalog snapshot refresh
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CONDO_CREDITS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `CONDO_CREDITS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CONDO_CREDITS__PAYMENT__STRIPE_WEBHOOK_SECRET=...` -> `payment.stripe_webhook_secret`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CONDO_CREDITS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Production additionally refuses unsigned webhook acceptance.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate(&self.server.environment)?;
        self.catalog.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("CONDO_CREDITS__DATABASE__URL", "postgresql://test@localhost/condo");
        env::set_var("CONDO_CREDITS__PAYMENT__STRIPE_API_KEY", "sk_test_xxx");
        env::set_var("CONDO_CREDITS__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx");
    }

    fn clear_env() {
        for key in [
            "CONDO_CREDITS__DATABASE__URL",
            "CONDO_CREDITS__PAYMENT__STRIPE_API_KEY",
            "CONDO_CREDITS__PAYMENT__STRIPE_WEBHOOK_SECRET",
            "CONDO_CREDITS__PAYMENT__ALLOW_UNSIGNED_WEBHOOKS",
            "CONDO_CREDITS__SERVER__PORT",
            "CONDO_CREDITS__SERVER__ENVIRONMENT",
            "CONDO_CREDITS__CATALOG__REFRESH_INTERVAL_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/condo");
        assert_eq!(config.payment.webhook_secret(), Some("whsec_xxx"));
        assert_eq!(config.catalog.refresh_interval_secs, 300);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CONDO_CREDITS__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().server.port, 3000);
    }

    #[test]
    fn test_production_refuses_unsigned_webhooks() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CONDO_CREDITS__SERVER__ENVIRONMENT", "production");
        env::set_var("CONDO_CREDITS__PAYMENT__ALLOW_UNSIGNED_WEBHOOKS", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::UnsignedWebhooksInProduction)
        ));
    }
}
