//! Validated builder for `ProbeConfig`
//!
//! This module provides a fluent builder that checks cross-field invariants
//! (timeouts, ranges) once, when `build()` is called.

use anyhow::{Result, bail};

use super::types::ProbeConfig;
use crate::utils::constants::MAX_CONCURRENCY;

/// Fluent builder for [`ProbeConfig`]
#[derive(Debug, Clone, Default)]
pub struct ProbeConfigBuilder {
    pub(crate) config: ProbeConfig,
}

impl ProbeConfig {
    /// Create a builder for configuring a `ProbeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ProbeConfigBuilder {
        ProbeConfigBuilder::default()
    }

    /// Check the invariants the builder enforces
    ///
    /// Useful for configs that arrive through serde rather than the builder.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            bail!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            );
        }
        if self.navigation_timeout_ms == 0 {
            bail!("navigation_timeout_ms must be greater than zero");
        }
        if self.force_abort_timeout_ms < self.navigation_timeout_ms {
            bail!(
                "force_abort_timeout_ms ({}) must not be shorter than navigation_timeout_ms ({})",
                self.force_abort_timeout_ms,
                self.navigation_timeout_ms
            );
        }
        if self.page_reset_timeout_ms == 0 {
            bail!("page_reset_timeout_ms must be greater than zero");
        }
        if self.max_requests_per_interval == 0 {
            bail!("max_requests_per_interval must be at least 1");
        }
        if self.rate_interval_ms == 0 {
            bail!("rate_interval_ms must be greater than zero");
        }
        if self.max_attempts_per_domain == 0 {
            bail!("max_attempts_per_domain must be at least 1");
        }
        if self.page_pool_size == Some(0) {
            bail!("page_pool_size must be at least 1 when set");
        }
        Ok(())
    }
}

impl ProbeConfigBuilder {
    pub fn build(self) -> Result<ProbeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProbeConfig::builder().build().expect("defaults should validate");
        assert_eq!(config.concurrency(), 10);
        assert_eq!(config.page_pool_size(), 10);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(config.force_abort_timeout(), Duration::from_secs(45));
        assert!(!config.https_only());
    }

    #[test]
    fn test_rejects_force_abort_shorter_than_navigation() {
        let result = ProbeConfig::builder()
            .navigation_timeout_ms(10_000)
            .force_abort_timeout_ms(5_000)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        assert!(ProbeConfig::builder().concurrency(0).build().is_err());
        assert!(ProbeConfig::builder().concurrency(10_000).build().is_err());
    }

    #[test]
    fn test_pool_size_follows_concurrency_unless_set() {
        let config = ProbeConfig::builder()
            .concurrency(4)
            .build()
            .expect("valid");
        assert_eq!(config.page_pool_size(), 4);

        let config = ProbeConfig::builder()
            .concurrency(4)
            .page_pool_size(2)
            .build()
            .expect("valid");
        assert_eq!(config.page_pool_size(), 2);
    }

    #[test]
    fn test_deserializes_partial_json() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"concurrency": 3, "https_only": true}"#).expect("json");
        assert_eq!(config.concurrency(), 3);
        assert!(config.https_only());
        assert_eq!(config.max_retries_per_error(), 2);
        assert!(config.validate().is_ok());
    }
}
