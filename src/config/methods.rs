//! Setter methods for `ProbeConfigBuilder`

use super::builder::ProbeConfigBuilder;

impl ProbeConfigBuilder {
    /// Set the per-navigation timeout handed to the page driver
    #[must_use]
    pub fn navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.config.navigation_timeout_ms = ms;
        self
    }

    /// Set the force-abort backstop
    ///
    /// When a navigation has not resolved after this long, the attempt is
    /// abandoned and its page is closed rather than returned to the pool.
    /// Must not be shorter than the navigation timeout.
    #[must_use]
    pub fn force_abort_timeout_ms(mut self, ms: u64) -> Self {
        self.config.force_abort_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn page_reset_timeout_ms(mut self, ms: u64) -> Self {
        self.config.page_reset_timeout_ms = ms;
        self
    }

    /// Set the number of concurrent workers
    ///
    /// Each worker runs one domain scan at a time, so this is also the upper
    /// bound on in-flight navigations.
    #[must_use]
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.config.concurrency = workers;
        self
    }

    #[must_use]
    pub fn page_pool_size(mut self, size: usize) -> Self {
        self.config.page_pool_size = Some(size);
        self
    }

    /// Set the rate limit as `requests` navigations per `interval_ms`
    ///
    /// # Example
    /// ```rust
    /// # use domain_probe::config::ProbeConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = ProbeConfig::builder()
    ///     .rate_limit(50, 10_000) // 50 navigations every 10 seconds
    ///     .build()?;
    /// assert_eq!(config.max_requests_per_interval(), 50);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn rate_limit(mut self, requests: u32, interval_ms: u64) -> Self {
        self.config.max_requests_per_interval = requests;
        self.config.rate_interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub fn max_attempts_per_domain(mut self, attempts: u32) -> Self {
        self.config.max_attempts_per_domain = attempts;
        self
    }

    #[must_use]
    pub fn max_retries_per_error(mut self, retries: u32) -> Self {
        self.config.max_retries_per_error = retries;
        self
    }

    /// Drop every plain-HTTP variant from retry candidates
    #[must_use]
    pub fn https_only(mut self, https_only: bool) -> Self {
        self.config.https_only = https_only;
        self
    }

    /// Treat redirects that stay within the same base domain as active
    ///
    /// The base domain is approximated as the last two labels, so this is
    /// unreliable for multi-part public suffixes such as `.co.uk`.
    #[must_use]
    pub fn ignore_similar_redirects(mut self, ignore: bool) -> Self {
        self.config.ignore_similar_redirects = ignore;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }
}
