//! Core configuration types for domain probing
//!
//! This module contains the main `ProbeConfig` struct that carries every
//! tunable the scheduler, scan machine and probe executor read.

use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_FORCE_ABORT_TIMEOUT_MS, DEFAULT_MAX_ATTEMPTS_PER_DOMAIN,
    DEFAULT_MAX_REQUESTS_PER_INTERVAL, DEFAULT_MAX_RETRIES_PER_ERROR,
    DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_PAGE_RESET_TIMEOUT_MS, DEFAULT_RATE_INTERVAL_MS,
};

/// Main configuration struct for a probe run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Bound handed to the page driver for a single navigation
    ///
    /// Default: 30 seconds
    pub(crate) navigation_timeout_ms: u64,

    /// Backstop after which an unresolved navigation is abandoned and its
    /// page closed
    ///
    /// **INVARIANT:** never shorter than `navigation_timeout_ms` (checked in builder).
    ///
    /// Default: 45 seconds
    pub(crate) force_abort_timeout_ms: u64,

    /// Bound on resetting a reused page to a blank state
    ///
    /// Default: 5 seconds
    pub(crate) page_reset_timeout_ms: u64,

    /// Number of concurrent workers (and therefore in-flight navigations)
    ///
    /// Default: 10, Range: 1-256
    pub(crate) concurrency: usize,

    /// Number of pages created up front; `None` means "same as concurrency"
    pub(crate) page_pool_size: Option<usize>,

    /// Token bucket capacity, refilled over `rate_interval_ms`
    ///
    /// Default: 20
    pub(crate) max_requests_per_interval: u32,

    /// Token bucket refill interval
    ///
    /// Default: 1 second
    pub(crate) rate_interval_ms: u64,

    /// Maximum navigations for a single domain scan
    ///
    /// Default: 6
    pub(crate) max_attempts_per_domain: u32,

    /// A failure class seen more often than this ends the scan
    ///
    /// Default: 2
    pub(crate) max_retries_per_error: u32,

    /// Never try plain-HTTP variants
    pub(crate) https_only: bool,

    /// Treat redirects within the same base domain as active
    pub(crate) ignore_similar_redirects: bool,

    /// Run the browser headless (only consulted by the Chromium driver)
    pub(crate) headless: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            force_abort_timeout_ms: DEFAULT_FORCE_ABORT_TIMEOUT_MS,
            page_reset_timeout_ms: DEFAULT_PAGE_RESET_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
            page_pool_size: None,
            max_requests_per_interval: DEFAULT_MAX_REQUESTS_PER_INTERVAL,
            rate_interval_ms: DEFAULT_RATE_INTERVAL_MS,
            max_attempts_per_domain: DEFAULT_MAX_ATTEMPTS_PER_DOMAIN,
            max_retries_per_error: DEFAULT_MAX_RETRIES_PER_ERROR,
            https_only: false,
            ignore_similar_redirects: false,
            headless: true,
        }
    }
}
