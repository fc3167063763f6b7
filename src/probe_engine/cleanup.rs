//! Resource teardown after a run or on interrupt
//!
//! Failures here are collected, never propagated: a batch that finished
//! probing must still report its results.

use log::{debug, info, warn};

use crate::driver::PageDriver;
use crate::page_pool::PagePool;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

impl CleanupResult {
    fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Success
        } else {
            Self::PartialFailure(errors)
        }
    }
}

/// Destroy the page pool, then sweep any page the driver still has open
///
/// The sweep catches transient pages and pages abandoned by aborted scans.
pub async fn teardown<D: PageDriver>(pool: &PagePool<D>, driver: &D) -> CleanupResult {
    let mut errors = Vec::new();

    debug!(target: "domain_probe::cleanup", "Destroying page pool");
    match pool.destroy().await {
        Ok(closed) => {
            debug!(target: "domain_probe::cleanup", "Closed {closed} pooled pages");
        }
        Err(e) => {
            warn!(target: "domain_probe::cleanup", "Page pool destroy incomplete: {e}");
            errors.push(format!("Pool destroy failed: {e}"));
        }
    }

    debug!(target: "domain_probe::cleanup", "Sweeping lingering driver pages");
    match driver.close_all_pages().await {
        Ok(0) => {}
        Ok(swept) => {
            info!(target: "domain_probe::cleanup", "Closed {swept} lingering pages");
        }
        Err(e) => {
            warn!(target: "domain_probe::cleanup", "Failed to sweep driver pages: {e}");
            errors.push(format!("Page sweep failed: {e}"));
        }
    }

    CleanupResult::from_errors(errors)
}

/// Shut the driver's browser down
pub async fn shutdown_driver<D: PageDriver>(driver: &D) -> CleanupResult {
    debug!(target: "domain_probe::cleanup", "Shutting down page driver");
    match driver.shutdown().await {
        Ok(()) => {
            debug!(target: "domain_probe::cleanup", "Page driver shut down");
            CleanupResult::Success
        }
        Err(e) => {
            warn!(target: "domain_probe::cleanup", "Page driver shutdown failed: {e}");
            CleanupResult::PartialFailure(vec![format!("Driver shutdown failed: {e}")])
        }
    }
}
