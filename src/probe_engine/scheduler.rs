//! Worker pool running domain scans
//!
//! A single shared queue feeds exactly `concurrency` workers. Each worker
//! pops a task, runs its scan to completion and pops again, so at most
//! `concurrency` navigations are ever in flight. The rate limiter and page
//! pool are built per run and torn down when the last worker finishes.

use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use log::{debug, error, info, warn};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, Notify, mpsc};

use super::cleanup::{self, CleanupResult};
use super::probe_executor::ProbeExecutor;
use super::probe_types::{DomainTask, ProbeEngineResult, ProbeError, ScanOutcome, ScanReport};
use super::progress::ProgressReporter;
use super::rate_limiter::RateLimiter;
use super::scan_state::DomainScan;
use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::page_pool::PagePool;

type TaskQueue = Arc<Mutex<VecDeque<DomainTask>>>;

/// Runs batches of domain tasks against one page driver
pub struct Scheduler<D: PageDriver> {
    driver: Arc<D>,
    config: ProbeConfig,
    interrupted: AtomicBool,
    interrupt: Notify,
}

impl<D: PageDriver> Scheduler<D> {
    /// Create a scheduler; the configuration is validated here
    pub fn new(driver: Arc<D>, config: ProbeConfig) -> ProbeEngineResult<Self> {
        config
            .validate()
            .map_err(|e| ProbeError::Config(format!("{e:#}")))?;

        Ok(Self {
            driver,
            config,
            interrupted: AtomicBool::new(false),
            interrupt: Notify::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Abandon the current run: workers are aborted, resources torn down and
    /// `run` returns whatever outcomes were already produced
    ///
    /// The scheduler stays interrupted; later runs return immediately.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
        self.interrupt.notify_one();
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Scan every task, reporting each outcome as soon as it is decided
    ///
    /// Returns the reports in completion order, one per task unless the run
    /// was interrupted.
    pub async fn run<P>(&self, tasks: Vec<DomainTask>, reporter: P) -> Vec<ScanReport>
    where
        P: ProgressReporter + 'static,
    {
        let total_tasks = tasks.len();
        if self.is_interrupted() {
            warn!(target: "domain_probe::scheduler", "Scheduler interrupted, not starting run");
            return Vec::new();
        }
        if tasks.is_empty() {
            reporter.report_completed(0);
            return Vec::new();
        }

        let start_time = Instant::now();
        let reporter = Arc::new(reporter);
        let config = Arc::new(self.config.clone());

        // Shared resources live exactly as long as this run
        let limiter = Arc::new(RateLimiter::new(
            config.max_requests_per_interval(),
            config.rate_interval(),
        ));
        let pool = PagePool::new(
            Arc::clone(&self.driver),
            config.page_pool_size(),
            config.page_reset_timeout(),
        );
        if let Err(e) = pool.initialize().await {
            warn!(target: "domain_probe::scheduler", "Page pool initialization incomplete: {e}");
        }
        let executor = ProbeExecutor::new(Arc::clone(&pool), limiter);

        let queue: TaskQueue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let workers = config.concurrency().min(total_tasks);

        info!(
            target: "domain_probe::scheduler",
            "Scanning {total_tasks} domains with {workers} workers"
        );

        let mut active_workers = FuturesUnordered::new();
        for worker_id in 0..workers {
            active_workers.push(tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&queue),
                executor.clone(),
                Arc::clone(&config),
                Arc::clone(&reporter),
                results_tx.clone(),
            )));
        }
        drop(results_tx);

        let interrupted = loop {
            tokio::select! {
                joined = active_workers.next() => match joined {
                    Some(Ok(completed)) => {
                        debug!(target: "domain_probe::scheduler", "Worker finished after {completed} scans");
                    }
                    Some(Err(e)) => {
                        error!(target: "domain_probe::scheduler", "Task panicked: {e}");
                    }
                    None => break false,
                },
                () = self.interrupt.notified() => break true,
            }
        };

        if interrupted {
            warn!(
                target: "domain_probe::scheduler",
                "Interrupted, abandoning {} in-flight workers",
                active_workers.len()
            );
            for worker in active_workers.iter() {
                worker.abort();
            }
        }

        match cleanup::teardown(&pool, self.driver.as_ref()).await {
            CleanupResult::Success => {
                debug!(target: "domain_probe::scheduler", "Run resources released");
            }
            CleanupResult::PartialFailure(errors) => {
                warn!(target: "domain_probe::scheduler", "Cleanup completed with failures: {errors:?}");
            }
        }

        let mut reports = Vec::with_capacity(total_tasks);
        while let Ok(report) = results_rx.try_recv() {
            reports.push(report);
        }

        info!(
            target: "domain_probe::scheduler",
            "Run finished: {}/{} domains in {:?}",
            reports.len(),
            total_tasks,
            start_time.elapsed()
        );
        reporter.report_completed(reports.len());
        reports
    }
}

/// Pop and scan tasks until the queue is empty; returns the number scanned
async fn run_worker<D, P>(
    worker_id: usize,
    queue: TaskQueue,
    executor: ProbeExecutor<D>,
    config: Arc<ProbeConfig>,
    reporter: Arc<P>,
    results: mpsc::UnboundedSender<ScanReport>,
) -> usize
where
    D: PageDriver,
    P: ProgressReporter + 'static,
{
    let mut completed = 0;

    loop {
        let next = queue.lock().await.pop_front();
        let Some(task) = next else {
            break;
        };

        let scanned = AssertUnwindSafe(async {
            let report = DomainScan::new(&task, &executor, &config, reporter.as_ref())
                .run()
                .await;
            reporter.report_outcome(&report);
            report
        })
        .catch_unwind()
        .await;

        // A panicking scan or callback still owes its task an outcome
        let report = match scanned {
            Ok(report) => report,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    target: "domain_probe::scheduler",
                    "Worker {worker_id}: scan of {} panicked: {message}",
                    task.original
                );
                ScanReport {
                    domain: task.original.clone(),
                    outcome: ScanOutcome::Inconclusive {
                        reason: format!("scan panicked: {message}"),
                    },
                    attempts: Vec::new(),
                }
            }
        };

        if results.send(report).is_err() {
            debug!(target: "domain_probe::scheduler", "Worker {worker_id}: result collector gone");
        }
        completed += 1;
    }

    debug!(target: "domain_probe::scheduler", "Worker {worker_id} idle, queue drained");
    completed
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
