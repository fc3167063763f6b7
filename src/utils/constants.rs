//! Shared configuration constants for domain probing
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Shortest hostname accepted for probing (`x.yz`)
pub const MIN_DOMAIN_LENGTH: usize = 4;

/// Default per-navigation timeout: 30 seconds
///
/// Passed to the page driver as the bound for a single navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default force-abort backstop: 45 seconds
///
/// Must be longer than the navigation timeout. Fires only when the page
/// driver itself never resolves the navigation.
pub const DEFAULT_FORCE_ABORT_TIMEOUT_MS: u64 = 45_000;

/// Default bound on resetting a reused page to `about:blank`
pub const DEFAULT_PAGE_RESET_TIMEOUT_MS: u64 = 5_000;

/// Default number of concurrent workers
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Upper bound accepted for the concurrency setting
pub const MAX_CONCURRENCY: usize = 256;

/// Default token bucket: 20 navigations per interval
pub const DEFAULT_MAX_REQUESTS_PER_INTERVAL: u32 = 20;

/// Default token bucket interval: 1 second
pub const DEFAULT_RATE_INTERVAL_MS: u64 = 1_000;

/// Default cap on navigations for a single domain scan
pub const DEFAULT_MAX_ATTEMPTS_PER_DOMAIN: u32 = 6;

/// Default cap on repeats of the same failure class within one scan
pub const DEFAULT_MAX_RETRIES_PER_ERROR: u32 = 2;

/// How long the driver keeps draining network events after a navigation
/// settles, looking for the response that matches the requested URL
pub const RESPONSE_EVENT_DRAIN_MS: u64 = 250;

/// Chrome user agent string used by the headless driver
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
