//! Chromium-backed page driver
//!
//! One headless browser process per driver; every `ChromiumPage` is a tab in
//! it. Navigation status is read from CDP network events rather than from the
//! DOM, so a `301` on the requested URL is visible even though the tab ends
//! up somewhere else.

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, EventRequestWillBeSent, EventResponseReceived, ResourceType,
};
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use url::Url;
use uuid::Uuid;

use super::browser_setup::launch_browser;
use super::{DriverError, NavigationResponse, PageDriver, PageHandle};
use crate::utils::constants::RESPONSE_EVENT_DRAIN_MS;

/// Page driver backed by a single chromiumoxide `Browser`
pub struct ChromiumDriver {
    browser: RwLock<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    user_data_dir: Option<PathBuf>,
}

impl ChromiumDriver {
    /// Launch a browser with a fresh, uniquely named profile directory
    pub async fn launch(headless: bool) -> Result<Self, DriverError> {
        let user_data_dir =
            std::env::temp_dir().join(format!("domain_probe_chrome_{}", Uuid::new_v4()));
        debug!("Creating Chrome profile: {}", user_data_dir.display());

        let (browser, handler) = launch_browser(headless, user_data_dir.clone())
            .await
            .map_err(|e| DriverError::Launch(format!("{e:#}")))?;

        Ok(Self {
            browser: RwLock::new(Some(browser)),
            handler: Mutex::new(Some(handler)),
            user_data_dir: Some(user_data_dir),
        })
    }

    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up Chrome profile directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.get_mut().take() {
            debug!("Dropping ChromiumDriver - aborting handler task");
            handler.abort();
        }
        self.cleanup_temp_dir();
    }
}

impl PageDriver for ChromiumDriver {
    type Page = ChromiumPage;

    async fn new_page(&self) -> Result<ChromiumPage, DriverError> {
        let guard = self.browser.read().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| DriverError::PageCreation("browser is shut down".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::PageCreation(e.to_string()))?;

        Ok(ChromiumPage { page })
    }

    async fn close_all_pages(&self) -> Result<usize, DriverError> {
        let guard = self.browser.read().await;
        let Some(browser) = guard.as_ref() else {
            return Ok(0);
        };

        let pages = browser
            .pages()
            .await
            .map_err(|e| DriverError::Close(e.to_string()))?;

        let mut closed = 0;
        for page in pages {
            match page.close().await {
                Ok(()) => closed += 1,
                Err(e) => warn!("Failed to close lingering page: {e}"),
            }
        }
        Ok(closed)
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        let mut errors = Vec::new();

        if let Some(mut browser) = self.browser.write().await.take() {
            debug!("Closing browser");
            if let Err(e) = browser.close().await {
                errors.push(format!("browser close failed: {e}"));
            }
            // Wait for the process to exit so the profile dir is no longer locked
            if let Err(e) = browser.wait().await {
                errors.push(format!("browser wait failed: {e}"));
            }
        }

        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
            if let Err(e) = handler.await
                && !e.is_cancelled()
            {
                errors.push(format!("handler task failed: {e}"));
            }
        }

        if let Some(path) = &self.user_data_dir
            && let Err(e) = tokio::fs::remove_dir_all(path).await
        {
            debug!("Profile directory {} not removed: {e}", path.display());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DriverError::Close(errors.join("; ")))
        }
    }
}

/// A single Chromium tab
#[derive(Debug)]
pub struct ChromiumPage {
    page: Page,
}

impl PageHandle for ChromiumPage {
    async fn reset(&mut self) -> Result<(), DriverError> {
        self.page
            .goto("about:blank")
            .await
            .map_err(|e| DriverError::Reset(e.to_string()))?;
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(|e| DriverError::Reset(e.to_string()))?;
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<NavigationResponse, DriverError> {
        // Subscribe before navigating so the first response cannot be missed
        let mut redirects = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Err(_) => {
                return Err(DriverError::Timeout {
                    operation: "Navigation".to_string(),
                    after: timeout,
                });
            }
            Ok(Err(e)) => return Err(DriverError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        let requested = Url::parse(url).ok();
        let deadline = Instant::now() + Duration::from_millis(RESPONSE_EVENT_DRAIN_MS);

        // A redirect away from the requested URL and a document response for
        // it are mutually exclusive, so whichever arrives first decides
        let status = first_status(
            &mut redirects,
            |event: &EventRequestWillBeSent| {
                let response = event.redirect_response.as_ref()?;
                urls_match(requested.as_ref(), &response.url).then_some(response.status)
            },
            &mut responses,
            |event: &EventResponseReceived| {
                (event.r#type == ResourceType::Document
                    && urls_match(requested.as_ref(), &event.response.url))
                .then_some(event.response.status)
            },
            deadline,
        )
        .await;

        let final_url = match self.page.url().await {
            Ok(url) => url,
            Err(e) => {
                trace!("Failed to read page URL after navigation: {e}");
                None
            }
        };

        Ok(NavigationResponse { status, final_url })
    }

    async fn close(self) -> Result<(), DriverError> {
        self.page
            .close()
            .await
            .map_err(|e| DriverError::Close(e.to_string()))
    }
}

/// Read two event streams side by side until either yields a status or the
/// deadline passes
async fn first_status<A, B, SA, SB, FA, FB>(
    first: &mut SA,
    first_extract: FA,
    second: &mut SB,
    second_extract: FB,
    deadline: Instant,
) -> Option<u16>
where
    SA: Stream<Item = Arc<A>> + Unpin,
    SB: Stream<Item = Arc<B>> + Unpin,
    FA: Fn(&A) -> Option<i64>,
    FB: Fn(&B) -> Option<i64>,
{
    let expired = tokio::time::sleep_until(deadline);
    tokio::pin!(expired);
    let mut first_open = true;
    let mut second_open = true;

    while first_open || second_open {
        let status = tokio::select! {
            event = first.next(), if first_open => match event {
                Some(event) => first_extract(&event),
                None => {
                    first_open = false;
                    None
                }
            },
            event = second.next(), if second_open => match event {
                Some(event) => second_extract(&event),
                None => {
                    second_open = false;
                    None
                }
            },
            () = &mut expired => return None,
        };

        if let Some(status) = status {
            return u16::try_from(status).ok();
        }
    }
    None
}

/// Compare URLs after normalization (`https://a.com` == `https://a.com/`)
fn urls_match(requested: Option<&Url>, observed: &str) -> bool {
    match (requested, Url::parse(observed)) {
        (Some(requested), Ok(observed)) => {
            requested.scheme() == observed.scheme()
                && requested.host_str() == observed.host_str()
                && requested.port_or_known_default() == observed.port_or_known_default()
                && requested.path() == observed.path()
        }
        _ => false,
    }
}
