//! Single-URL probe: throttle, check out a page, navigate, classify.

use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};

use super::error_classifier::classify_driver_error;
use super::probe_types::{ErrorCode, ProbeResult};
use super::rate_limiter::RateLimiter;
use crate::driver::{DriverError, NavigationResponse, PageDriver, PageHandle};
use crate::page_pool::PagePool;

/// How a navigation ended, before classification
enum NavigationOutcome {
    Completed(NavigationResponse),
    Failed(DriverError),
    /// The force-abort backstop fired; the page is in an unknown state
    ForceAborted,
    /// The guard no longer holds a page
    PageMissing,
}

/// Drives one URL attempt end to end
pub struct ProbeExecutor<D: PageDriver> {
    pool: Arc<PagePool<D>>,
    limiter: Arc<RateLimiter>,
}

impl<D: PageDriver> Clone for ProbeExecutor<D> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<D: PageDriver> ProbeExecutor<D> {
    pub fn new(pool: Arc<PagePool<D>>, limiter: Arc<RateLimiter>) -> Self {
        Self { pool, limiter }
    }

    /// Probe `url` once
    ///
    /// Never fails: pool and navigation errors are folded into a failed
    /// `ProbeResult`. A page that cannot be obtained at all is reported as
    /// `PageUnavailable`, never as a navigation error. The navigation is
    /// bounded by `navigation_timeout`; if the driver still has not returned
    /// by `force_abort_timeout` the future is dropped and the page discarded
    /// rather than returned to the pool.
    /// Every other outcome releases the page.
    pub async fn probe(
        &self,
        url: &str,
        navigation_timeout: Duration,
        force_abort_timeout: Duration,
    ) -> ProbeResult {
        self.limiter.acquire_token().await;

        let mut page = match self.pool.acquire().await {
            Ok(page) => page,
            Err(e) => {
                warn!("No page available for {}: {}", url, e);
                return ProbeResult::failure(ErrorCode::PageUnavailable, e.to_string());
            }
        };

        let outcome = match page.page_mut() {
            Some(handle) => {
                match tokio::time::timeout(
                    force_abort_timeout,
                    handle.navigate(url, navigation_timeout),
                )
                .await
                {
                    Ok(Ok(response)) => NavigationOutcome::Completed(response),
                    Ok(Err(e)) => NavigationOutcome::Failed(e),
                    Err(_) => NavigationOutcome::ForceAborted,
                }
            }
            None => NavigationOutcome::PageMissing,
        };

        match outcome {
            NavigationOutcome::Completed(response) => {
                page.release().await;
                classify_response(url, response)
            }
            NavigationOutcome::Failed(e) => {
                // Reset-on-acquire clears whatever the failed navigation left behind
                page.release().await;
                let code = classify_driver_error(&e);
                debug!("Navigation to {} failed ({}): {}", url, code, e);
                ProbeResult::failure(code, e.to_string())
            }
            NavigationOutcome::PageMissing => {
                page.discard().await;
                ProbeResult::failure(ErrorCode::PageUnavailable, "checked-out page missing")
            }
            NavigationOutcome::ForceAborted => {
                warn!(
                    "Force-abort after {:?} navigating to {}",
                    force_abort_timeout, url
                );
                page.discard().await;
                ProbeResult::failure(
                    ErrorCode::ConnectionTimedOut,
                    format!("navigation force-aborted after {force_abort_timeout:?}"),
                )
            }
        }
    }
}

/// Map a completed navigation to success or failure
///
/// `[200, 399]` is success; a status >= 400 or no matching response at all
/// is a failure.
pub fn classify_response(url: &str, response: NavigationResponse) -> ProbeResult {
    let NavigationResponse { status, final_url } = response;
    let final_url = final_url.or_else(|| Some(url.to_string()));

    match status {
        Some(code @ 200..=399) => ProbeResult {
            success: true,
            http_status: Some(code),
            final_url,
            error_code: None,
            reason: None,
        },
        Some(code) => ProbeResult {
            success: false,
            http_status: Some(code),
            final_url,
            error_code: Some(ErrorCode::Http(code)),
            reason: Some(format!("HTTP {code} from {url}")),
        },
        None => ProbeResult {
            success: false,
            http_status: None,
            final_url,
            error_code: Some(ErrorCode::NoResponse),
            reason: Some(format!("no response received from {url}")),
        },
    }
}
