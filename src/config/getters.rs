//! Getter methods for `ProbeConfig`
//!
//! This module provides all the accessor methods for retrieving configuration
//! values from a `ProbeConfig` instance.

use std::time::Duration;

use super::types::ProbeConfig;

impl ProbeConfig {
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    #[must_use]
    pub fn force_abort_timeout(&self) -> Duration {
        Duration::from_millis(self.force_abort_timeout_ms)
    }

    #[must_use]
    pub fn page_reset_timeout(&self) -> Duration {
        Duration::from_millis(self.page_reset_timeout_ms)
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Get the number of pages created when the pool starts
    ///
    /// Falls back to the concurrency level so every worker finds a warm page.
    #[must_use]
    pub fn page_pool_size(&self) -> usize {
        self.page_pool_size.unwrap_or(self.concurrency)
    }

    #[must_use]
    pub fn max_requests_per_interval(&self) -> u32 {
        self.max_requests_per_interval
    }

    #[must_use]
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    #[must_use]
    pub fn max_attempts_per_domain(&self) -> u32 {
        self.max_attempts_per_domain
    }

    #[must_use]
    pub fn max_retries_per_error(&self) -> u32 {
        self.max_retries_per_error
    }

    #[must_use]
    pub fn https_only(&self) -> bool {
        self.https_only
    }

    #[must_use]
    pub fn ignore_similar_redirects(&self) -> bool {
        self.ignore_similar_redirects
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }
}
