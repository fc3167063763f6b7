//! Fixed-size pool of reusable pages with transient overflow
//!
//! Creating a page is the most expensive step of a probe, so the pool keeps
//! up to `size` pages alive and hands them out again after a bounded reset.
//! When every pooled page is checked out the pool never blocks: it creates a
//! transient page instead, which is closed rather than returned on release.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{DriverError, PageDriver, PageHandle};
use crate::probe_engine::page_timeout::with_page_timeout;

/// Whether a checked-out page goes back to the pool or is closed on release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Pooled,
    Transient,
}

/// A pooled page with its pool id
struct PoolEntry<P> {
    id: u64,
    page: P,
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured number of reusable pages
    pub size: usize,
    /// Pooled pages currently idle
    pub available: usize,
    /// Pages (pooled and transient) currently checked out
    pub in_use: usize,
    /// Pages created by the driver over the pool's lifetime
    pub created: u64,
    /// How many of `created` were transient overflow pages
    pub transient_created: u64,
    /// Pages dropped from the pool after a failed reset or navigation
    pub discarded: u64,
}

// =============================================================================
// Page Pool
// =============================================================================

/// Pool of reusable driver pages
pub struct PagePool<D: PageDriver> {
    driver: Arc<D>,
    size: usize,
    reset_timeout: Duration,
    /// Idle pooled pages
    available: Mutex<VecDeque<PoolEntry<D::Page>>>,
    /// Pool-owned pages alive, idle or checked out; never exceeds `size`
    owned_count: AtomicUsize,
    in_use_count: AtomicUsize,
    next_id: AtomicU64,
    created_count: AtomicU64,
    transient_count: AtomicU64,
    discarded_count: AtomicU64,
    shutdown: AtomicBool,
}

impl<D: PageDriver> PagePool<D> {
    /// Create an empty pool; call [`initialize`](Self::initialize) to pre-warm it
    pub fn new(driver: Arc<D>, size: usize, reset_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            driver,
            size,
            reset_timeout,
            available: Mutex::new(VecDeque::with_capacity(size)),
            owned_count: AtomicUsize::new(0),
            in_use_count: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            created_count: AtomicU64::new(0),
            transient_count: AtomicU64::new(0),
            discarded_count: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Eagerly create pages up to the pool size
    ///
    /// Pages that were created stay in the pool even when others fail; the
    /// error reports how many could not be created. Returns the number of
    /// pages created by this call.
    pub async fn initialize(&self) -> Result<usize, DriverError> {
        let missing = self
            .size
            .saturating_sub(self.owned_count.load(Ordering::Acquire));
        if missing == 0 {
            return Ok(0);
        }

        info!("Initializing page pool: creating {} pages", missing);
        self.owned_count.fetch_add(missing, Ordering::AcqRel);

        let futs: Vec<_> = (0..missing).map(|_| self.create_page()).collect();
        let results = futures::future::join_all(futs).await;

        let mut created = 0;
        let mut failures = Vec::new();
        {
            let mut available = self.available.lock().await;
            for result in results {
                match result {
                    Ok(entry) => {
                        available.push_back(entry);
                        created += 1;
                    }
                    Err(e) => {
                        self.owned_count.fetch_sub(1, Ordering::AcqRel);
                        failures.push(e.to_string());
                    }
                }
            }
        }

        if failures.is_empty() {
            info!("Page pool ready with {} pages", created);
            Ok(created)
        } else {
            warn!(
                "Page pool initialized with {}/{} pages",
                created, missing
            );
            Err(DriverError::PageCreation(format!(
                "{} of {} pool pages failed: {}",
                failures.len(),
                missing,
                failures.join("; ")
            )))
        }
    }

    /// Check out a page reset to a blank state
    ///
    /// Never waits for another caller to release: with the pool exhausted a
    /// transient page is created instead. A pooled page whose reset fails is
    /// closed and replaced by a fresh one without surfacing the failure.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledPage<D>, DriverError> {
        if self.is_shutdown() {
            return Err(DriverError::PageCreation("page pool is shut down".to_string()));
        }

        let idle = self.available.lock().await.pop_front();
        if let Some(mut entry) = idle {
            match with_page_timeout(entry.page.reset(), self.reset_timeout, "Page reset").await {
                Ok(()) => {
                    debug!("Acquired page {} from pool", entry.id);
                    return Ok(self.checkout(entry, PageKind::Pooled));
                }
                Err(e) => {
                    warn!("Page {} failed reset, replacing it: {}", entry.id, e);
                    self.discarded_count.fetch_add(1, Ordering::Relaxed);
                    self.close_quietly(entry).await;

                    // The replacement inherits the discarded page's pool slot
                    return match self.create_page().await {
                        Ok(fresh) => Ok(self.checkout(fresh, PageKind::Pooled)),
                        Err(e) => {
                            self.owned_count.fetch_sub(1, Ordering::AcqRel);
                            Err(e)
                        }
                    };
                }
            }
        }

        let claimed_slot = self
            .owned_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |owned| {
                (owned < self.size).then_some(owned + 1)
            })
            .is_ok();

        if claimed_slot {
            match self.create_page().await {
                Ok(entry) => {
                    debug!("Created pooled page {} on demand", entry.id);
                    Ok(self.checkout(entry, PageKind::Pooled))
                }
                Err(e) => {
                    self.owned_count.fetch_sub(1, Ordering::AcqRel);
                    Err(e)
                }
            }
        } else {
            let entry = self.create_page().await?;
            self.transient_count.fetch_add(1, Ordering::Relaxed);
            debug!("Pool exhausted, created transient page {}", entry.id);
            Ok(self.checkout(entry, PageKind::Transient))
        }
    }

    /// Close every idle page and refuse further acquires
    ///
    /// Pages checked out at this point are closed when released. Individual
    /// close failures are collected, not fatal. Returns the number of pages
    /// closed.
    pub async fn destroy(&self) -> Result<usize, DriverError> {
        info!("Destroying page pool");
        self.shutdown.store(true, Ordering::Release);

        let idle: Vec<_> = self.available.lock().await.drain(..).collect();
        let mut closed = 0;
        let mut errors = Vec::new();

        for entry in idle {
            self.owned_count.fetch_sub(1, Ordering::AcqRel);
            match with_page_timeout(entry.page.close(), self.reset_timeout, "Page close").await {
                Ok(()) => closed += 1,
                Err(e) => {
                    warn!("Failed to close page {}: {}", entry.id, e);
                    errors.push(format!("page {}: {e}", entry.id));
                }
            }
        }

        info!("Page pool destroyed ({} pages closed)", closed);
        if errors.is_empty() {
            Ok(closed)
        } else {
            Err(DriverError::Close(errors.join("; ")))
        }
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Snapshot of the pool counters
    pub async fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            available: self.available.lock().await.len(),
            in_use: self.in_use_count.load(Ordering::Relaxed),
            created: self.created_count.load(Ordering::Relaxed),
            transient_created: self.transient_count.load(Ordering::Relaxed),
            discarded: self.discarded_count.load(Ordering::Relaxed),
        }
    }

    async fn create_page(&self) -> Result<PoolEntry<D::Page>, DriverError> {
        let page = self.driver.new_page().await?;
        self.created_count.fetch_add(1, Ordering::Relaxed);
        Ok(PoolEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            page,
        })
    }

    fn checkout(self: &Arc<Self>, entry: PoolEntry<D::Page>, kind: PageKind) -> PooledPage<D> {
        self.in_use_count.fetch_add(1, Ordering::Relaxed);
        PooledPage {
            entry: Some(entry),
            kind,
            pool: Arc::clone(self),
        }
    }

    async fn close_quietly(&self, entry: PoolEntry<D::Page>) {
        if let Err(e) =
            with_page_timeout(entry.page.close(), self.reset_timeout, "Page close").await
        {
            debug!("Ignoring close failure for page {}: {}", entry.id, e);
        }
    }

    /// Return a checked-out page
    async fn release(&self, entry: PoolEntry<D::Page>, kind: PageKind) {
        self.in_use_count.fetch_sub(1, Ordering::Relaxed);

        match kind {
            PageKind::Pooled => {
                let id = entry.id;
                // Checked under the lock so a concurrent destroy cannot miss the page
                let rejected = {
                    let mut available = self.available.lock().await;
                    if self.is_shutdown() {
                        Some(entry)
                    } else {
                        available.push_back(entry);
                        None
                    }
                };

                match rejected {
                    None => debug!("Released page {} back to pool", id),
                    Some(entry) => {
                        self.owned_count.fetch_sub(1, Ordering::AcqRel);
                        self.close_quietly(entry).await;
                    }
                }
            }
            PageKind::Transient => {
                debug!("Closing transient page {}", entry.id);
                self.close_quietly(entry).await;
            }
        }
    }

    /// Close a checked-out page instead of reusing it
    async fn discard(&self, entry: PoolEntry<D::Page>, kind: PageKind) {
        self.in_use_count.fetch_sub(1, Ordering::Relaxed);
        if kind == PageKind::Pooled {
            self.owned_count.fetch_sub(1, Ordering::AcqRel);
            self.discarded_count.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Discarding page {} ({:?})", entry.id, kind);
        self.close_quietly(entry).await;
    }
}

// =============================================================================
// RAII Guard
// =============================================================================

/// Exclusive handle to a checked-out page
///
/// Prefer [`release`](Self::release) or [`discard`](Self::discard); if the
/// guard is dropped instead, the page is released on a spawned task.
pub struct PooledPage<D: PageDriver> {
    entry: Option<PoolEntry<D::Page>>,
    kind: PageKind,
    pool: Arc<PagePool<D>>,
}

impl<D: PageDriver> PooledPage<D> {
    /// Mutable access to the underlying page
    pub fn page_mut(&mut self) -> Option<&mut D::Page> {
        self.entry.as_mut().map(|entry| &mut entry.page)
    }

    /// The page's pool id
    pub fn id(&self) -> Option<u64> {
        self.entry.as_ref().map(|entry| entry.id)
    }

    #[must_use]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Return the page to the pool (transient pages are closed)
    pub async fn release(mut self) {
        if let Some(entry) = self.entry.take() {
            self.pool.release(entry, self.kind).await;
        }
    }

    /// Close the page; a pooled page frees its slot for a fresh one
    pub async fn discard(mut self) {
        if let Some(entry) = self.entry.take() {
            self.pool.discard(entry, self.kind).await;
        }
    }
}

impl<D: PageDriver> Drop for PooledPage<D> {
    fn drop(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        let pool = Arc::clone(&self.pool);
        let kind = self.kind;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pool.release(entry, kind).await });
            }
            Err(_) => {
                warn!("PooledPage {} dropped outside a runtime; page leaked", entry.id);
                pool.in_use_count.fetch_sub(1, Ordering::Relaxed);
                if kind == PageKind::Pooled {
                    pool.owned_count.fetch_sub(1, Ordering::AcqRel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NavigationResponse;

    #[derive(Default)]
    struct CountingDriver {
        created: AtomicUsize,
        closed: Arc<AtomicUsize>,
        fail_resets: AtomicBool,
    }

    struct CountingPage {
        fail_reset: bool,
        closed: Arc<AtomicUsize>,
    }

    impl PageHandle for CountingPage {
        async fn reset(&mut self) -> Result<(), DriverError> {
            if self.fail_reset {
                Err(DriverError::Reset("stuck".to_string()))
            } else {
                Ok(())
            }
        }

        async fn navigate(
            &mut self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<NavigationResponse, DriverError> {
            Ok(NavigationResponse::default())
        }

        async fn close(self) -> Result<(), DriverError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl PageDriver for CountingDriver {
        type Page = CountingPage;

        async fn new_page(&self) -> Result<CountingPage, DriverError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(CountingPage {
                fail_reset: self.fail_resets.load(Ordering::SeqCst),
                closed: Arc::clone(&self.closed),
            })
        }

        async fn close_all_pages(&self) -> Result<usize, DriverError> {
            Ok(0)
        }

        async fn shutdown(&self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_exhausted_pool_hands_out_transient_pages() {
        let driver = Arc::new(CountingDriver::default());
        let pool = PagePool::new(Arc::clone(&driver), 1, Duration::from_secs(1));
        assert_eq!(pool.initialize().await, Ok(1));

        let first = pool.acquire().await.expect("pooled page");
        let second = pool.acquire().await.expect("transient page");
        assert_eq!(first.kind(), PageKind::Pooled);
        assert_eq!(second.kind(), PageKind::Transient);

        second.release().await;
        first.release().await;

        let stats = pool.stats().await;
        assert_eq!(stats.available, 1);
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.transient_created, 1);
        assert_eq!(driver.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_reset_is_replaced_transparently() {
        let driver = Arc::new(CountingDriver::default());
        driver.fail_resets.store(true, Ordering::SeqCst);
        let pool = PagePool::new(Arc::clone(&driver), 1, Duration::from_secs(1));
        pool.initialize().await.expect("pool init");

        // Replacement pages are created with working resets
        driver.fail_resets.store(false, Ordering::SeqCst);
        let page = pool.acquire().await.expect("replacement page");
        assert_eq!(page.kind(), PageKind::Pooled);
        page.release().await;

        let stats = pool.stats().await;
        assert_eq!(stats.created, 2);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.available, 1);
    }

    #[tokio::test]
    async fn test_destroy_closes_idle_and_rejects_acquire() {
        let driver = Arc::new(CountingDriver::default());
        let pool = PagePool::new(Arc::clone(&driver), 2, Duration::from_secs(1));
        pool.initialize().await.expect("pool init");

        let held = pool.acquire().await.expect("page");
        assert_eq!(pool.destroy().await, Ok(1));
        assert!(pool.acquire().await.is_err());

        // Released after shutdown, so closed instead of pooled
        held.release().await;
        assert_eq!(driver.closed.load(Ordering::SeqCst), 2);
        assert_eq!(pool.stats().await.available, 0);
    }

    #[tokio::test]
    async fn test_release_racing_destroy_closes_page() {
        let driver = Arc::new(CountingDriver::default());
        let pool = PagePool::new(Arc::clone(&driver), 1, Duration::from_secs(1));
        pool.initialize().await.expect("pool init");
        let held = pool.acquire().await.expect("page");

        // Release parks on the idle-queue lock while destroy drains it
        let queue = pool.available.lock().await;
        let release = tokio::spawn(held.release());
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.shutdown.store(true, Ordering::Release);
        drop(queue);
        release.await.expect("release task");

        assert_eq!(pool.stats().await.available, 0);
        assert_eq!(driver.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_discard_frees_slot() {
        let driver = Arc::new(CountingDriver::default());
        let pool = PagePool::new(Arc::clone(&driver), 1, Duration::from_secs(1));
        pool.initialize().await.expect("pool init");

        pool.acquire().await.expect("page").discard().await;
        let next = pool.acquire().await.expect("page");
        assert_eq!(next.kind(), PageKind::Pooled);
        next.release().await;

        assert_eq!(driver.created.load(Ordering::SeqCst), 2);
    }
}
