pub mod config;
pub mod driver;
pub mod page_pool;
pub mod probe_engine;
pub mod utils;

pub use config::{ProbeConfig, ProbeConfigBuilder};
pub use driver::{ChromiumDriver, DriverError, NavigationResponse, PageDriver, PageHandle};
pub use page_pool::{PageKind, PagePool, PoolStats, PooledPage};
pub use probe_engine::{
    ChannelProgress, CleanupResult, Domain, DomainError, DomainTask, ErrorCode, FnProgress,
    NoOpProgress, ProbeAttempt, ProbeEngineResult, ProbeError, ProbeExecutor, ProbeResult,
    ProgressReporter, RateLimiter, ScanOutcome, ScanReport, Scheduler,
};

/// Probe a batch of domains with a fresh Chromium driver
///
/// Launches the browser, runs every task through a [`Scheduler`] and shuts the
/// browser down again. Use [`Scheduler`] directly to reuse a driver across
/// batches or to plug in another [`PageDriver`].
pub async fn probe_domains<P>(
    config: ProbeConfig,
    tasks: Vec<DomainTask>,
    reporter: P,
) -> ProbeEngineResult<Vec<ScanReport>>
where
    P: ProgressReporter + 'static,
{
    let driver = std::sync::Arc::new(ChromiumDriver::launch(config.headless()).await?);
    let scheduler = Scheduler::new(std::sync::Arc::clone(&driver), config)?;

    let reports = scheduler.run(tasks, reporter).await;

    if let CleanupResult::PartialFailure(errors) =
        probe_engine::cleanup::shutdown_driver(driver.as_ref()).await
    {
        log::warn!(target: "domain_probe::cleanup", "Browser shutdown incomplete: {errors:?}");
    }
    Ok(reports)
}
