//! Catalog refresh configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Controls how often packages and action costs are reloaded.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Seconds between snapshot reloads
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl CatalogConfig {
    /// Refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Validate catalog configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.refresh_interval_secs == 0 || self.refresh_interval_secs > 86_400 {
            return Err(ValidationError::InvalidRefreshInterval);
        }
        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_refreshes_every_five_minutes() {
        assert_eq!(
            CatalogConfig::default().refresh_interval(),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = CatalogConfig {
            refresh_interval_secs: 0,
        };
        assert!(config.validate().is_err());
    }
}
