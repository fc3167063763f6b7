//! Page driver abstraction
//!
//! The engine never speaks HTTP itself. It hands every navigation to a
//! `PageDriver`, which owns the expensive browser process and hands out
//! `PageHandle`s (tabs). The Chromium implementation lives in [`chromium`];
//! tests plug in scripted drivers through the same traits.

pub mod browser_setup;
pub mod chromium;

use std::future::Future;
use std::time::Duration;

pub use chromium::ChromiumDriver;

/// Error type for page driver operations
///
/// `Navigation` carries the driver's raw error text (for Chromium, strings
/// such as `net::ERR_NAME_NOT_RESOLVED`), which the error classifier maps to
/// an `ErrorCode`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The browser process could not be started
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// A new page (tab) could not be created
    #[error("Failed to create page: {0}")]
    PageCreation(String),

    /// Navigation failed inside the browser
    #[error("{0}")]
    Navigation(String),

    /// An operation did not complete in time
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Returning a page to a blank state failed
    #[error("Failed to reset page: {0}")]
    Reset(String),

    /// Closing a page or the browser failed
    #[error("Failed to close: {0}")]
    Close(String),
}

/// What a completed navigation observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationResponse {
    /// Status of the first document response matching the requested URL,
    /// redirect responses included
    pub status: Option<u16>,
    /// URL the page ended up on after redirects
    pub final_url: Option<String>,
}

/// A single reusable page (tab) owned by a driver
pub trait PageHandle: Send + 'static {
    /// Return the page to a neutral blank state with no leftover cookies or
    /// pending navigation
    fn reset(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Navigate to `url`, giving up after `timeout`
    fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<NavigationResponse, DriverError>> + Send;

    /// Close the page; the handle must not be used afterwards
    fn close(self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// Source of pages for the pool
pub trait PageDriver: Send + Sync + 'static {
    type Page: PageHandle;

    /// Create a fresh page. This is the most expensive operation in the pipeline.
    fn new_page(&self) -> impl Future<Output = Result<Self::Page, DriverError>> + Send;

    /// Close every page the driver still has open, returning how many were closed
    fn close_all_pages(&self) -> impl Future<Output = Result<usize, DriverError>> + Send;

    /// Shut the underlying browser down
    fn shutdown(&self) -> impl Future<Output = Result<(), DriverError>> + Send;
}
