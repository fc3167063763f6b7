//! Test utilities for the domain_probe test suite
//!
//! `ScriptedDriver` is an in-memory `PageDriver`: every URL maps to a scripted
//! response, and the driver counts pages and concurrent navigations so tests
//! can check pool and scheduler invariants without a browser.

use domain_probe::{DriverError, NavigationResponse, PageDriver, PageHandle, ProbeConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a navigation to a given URL does
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Scripted {
    /// Completes with this status; `final_url` defaults to the requested URL
    Status(u16, Option<String>),
    /// Completes without any matching response
    Silent,
    /// Fails with this raw driver error text
    Error(String),
    /// Never resolves, ignoring the navigation timeout
    Hang,
}

#[allow(dead_code)]
pub fn ok() -> Scripted {
    Scripted::Status(200, None)
}

#[allow(dead_code)]
pub fn redirect(status: u16, to: &str) -> Scripted {
    Scripted::Status(status, Some(to.to_string()))
}

#[allow(dead_code)]
pub fn error(text: &str) -> Scripted {
    Scripted::Error(text.to_string())
}

/// Counters observed by tests
#[derive(Debug, Default)]
pub struct DriverStats {
    pub pages_created: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub navigations: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub swept: AtomicBool,
    pub navigated: Mutex<Vec<String>>,
}

impl DriverStats {
    #[allow(dead_code)]
    pub fn navigated_urls(&self) -> Vec<String> {
        self.navigated.lock().expect("stats lock poisoned").clone()
    }
}

struct Script {
    routes: HashMap<String, Scripted>,
    fallback: Scripted,
    delay: Duration,
    page_creation_error: Option<String>,
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_ascii_lowercase()
}

/// In-memory page driver with per-URL scripted behavior
pub struct ScriptedDriver {
    script: Arc<Script>,
    pub stats: Arc<DriverStats>,
}

#[allow(dead_code)]
impl ScriptedDriver {
    /// Driver where every unscripted URL fails DNS resolution
    pub fn builder() -> ScriptedDriverBuilder {
        ScriptedDriverBuilder {
            routes: HashMap::new(),
            fallback: error("net::ERR_NAME_NOT_RESOLVED"),
            delay: Duration::ZERO,
            page_creation_error: None,
        }
    }
}

pub struct ScriptedDriverBuilder {
    routes: HashMap<String, Scripted>,
    fallback: Scripted,
    delay: Duration,
    page_creation_error: Option<String>,
}

#[allow(dead_code)]
impl ScriptedDriverBuilder {
    pub fn route(mut self, url: &str, response: Scripted) -> Self {
        self.routes.insert(normalize(url), response);
        self
    }

    pub fn fallback(mut self, response: Scripted) -> Self {
        self.fallback = response;
        self
    }

    /// Delay every navigation, making overlapping navigations observable
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every `new_page` call fail with this text, as a crashed browser would
    pub fn fail_page_creation(mut self, text: &str) -> Self {
        self.page_creation_error = Some(text.to_string());
        self
    }

    pub fn build(self) -> Arc<ScriptedDriver> {
        Arc::new(ScriptedDriver {
            script: Arc::new(Script {
                routes: self.routes,
                fallback: self.fallback,
                delay: self.delay,
                page_creation_error: self.page_creation_error,
            }),
            stats: Arc::new(DriverStats::default()),
        })
    }
}

pub struct ScriptedPage {
    script: Arc<Script>,
    stats: Arc<DriverStats>,
}

/// Decrements the in-flight counter even when the navigation is dropped
struct InFlight<'a>(&'a DriverStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a DriverStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PageHandle for ScriptedPage {
    async fn reset(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        _timeout: Duration,
    ) -> Result<NavigationResponse, DriverError> {
        let _in_flight = InFlight::enter(&self.stats);
        self.stats.navigations.fetch_add(1, Ordering::SeqCst);
        self.stats
            .navigated
            .lock()
            .expect("stats lock poisoned")
            .push(url.to_string());

        if !self.script.delay.is_zero() {
            tokio::time::sleep(self.script.delay).await;
        }

        let response = self
            .script
            .routes
            .get(&normalize(url))
            .unwrap_or(&self.script.fallback)
            .clone();

        match response {
            Scripted::Status(status, final_url) => Ok(NavigationResponse {
                status: Some(status),
                final_url: Some(final_url.unwrap_or_else(|| format!("{url}/"))),
            }),
            Scripted::Silent => Ok(NavigationResponse {
                status: None,
                final_url: Some(url.to_string()),
            }),
            Scripted::Error(text) => Err(DriverError::Navigation(text)),
            Scripted::Hang => std::future::pending().await,
        }
    }

    async fn close(self) -> Result<(), DriverError> {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl PageDriver for ScriptedDriver {
    type Page = ScriptedPage;

    async fn new_page(&self) -> Result<ScriptedPage, DriverError> {
        if let Some(text) = &self.script.page_creation_error {
            return Err(DriverError::PageCreation(text.clone()));
        }
        self.stats.pages_created.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedPage {
            script: Arc::clone(&self.script),
            stats: Arc::clone(&self.stats),
        })
    }

    async fn close_all_pages(&self) -> Result<usize, DriverError> {
        self.stats.swept.store(true, Ordering::SeqCst);
        Ok(0)
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Config with short timeouts and a rate limit high enough not to matter
#[allow(dead_code)]
pub fn fast_config(concurrency: usize) -> ProbeConfig {
    ProbeConfig::builder()
        .concurrency(concurrency)
        .navigation_timeout_ms(200)
        .force_abort_timeout_ms(300)
        .page_reset_timeout_ms(200)
        .rate_limit(10_000, 1000)
        .build()
        .expect("valid test config")
}
