//! Progress reporting abstraction for probe runs
//!
//! Defines the `ProgressReporter` trait the scheduler calls as scans start,
//! attempts land and outcomes are decided. Outcomes are reported the moment a
//! domain finishes, so writers can stream results instead of waiting for the
//! whole batch.

use tokio::sync::mpsc;

use super::probe_types::{Domain, ProbeAttempt, ScanReport};

/// Trait for reporting probe progress at key lifecycle events
pub trait ProgressReporter: Send + Sync {
    /// A worker picked up a domain
    fn report_scan_started(&self, domain: &Domain);

    /// One navigation attempt finished
    fn report_attempt(&self, domain: &Domain, attempt: &ProbeAttempt);

    /// A domain reached its terminal outcome
    fn report_outcome(&self, report: &ScanReport);

    /// Every worker finished; `total` outcomes were reported
    fn report_completed(&self, total: usize);
}

/// Progress reporter that does nothing
///
/// All methods are no-ops and will be inlined away by the compiler.
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_scan_started(&self, _domain: &Domain) {}

    #[inline(always)]
    fn report_attempt(&self, _domain: &Domain, _attempt: &ProbeAttempt) {}

    #[inline(always)]
    fn report_outcome(&self, _report: &ScanReport) {}

    #[inline(always)]
    fn report_completed(&self, _total: usize) {}
}

/// Calls a closure with every finished `ScanReport`
pub struct FnProgress<F> {
    on_outcome: F,
}

impl<F> FnProgress<F>
where
    F: Fn(&ScanReport) + Send + Sync,
{
    pub fn new(on_outcome: F) -> Self {
        Self { on_outcome }
    }
}

impl<F> ProgressReporter for FnProgress<F>
where
    F: Fn(&ScanReport) + Send + Sync,
{
    #[inline(always)]
    fn report_scan_started(&self, _domain: &Domain) {}

    #[inline(always)]
    fn report_attempt(&self, _domain: &Domain, _attempt: &ProbeAttempt) {}

    fn report_outcome(&self, report: &ScanReport) {
        (self.on_outcome)(report);
    }

    #[inline(always)]
    fn report_completed(&self, _total: usize) {}
}

/// Streams finished reports into an unbounded channel
///
/// A dropped receiver is tolerated; reports are then discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ScanReport>,
}

impl ChannelProgress {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScanReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelProgress {
    fn report_scan_started(&self, domain: &Domain) {
        log::trace!(target: "domain_probe::scan", "Scan started: {domain}");
    }

    fn report_attempt(&self, _domain: &Domain, _attempt: &ProbeAttempt) {}

    fn report_outcome(&self, report: &ScanReport) {
        if self.tx.send(report.clone()).is_err() {
            log::debug!(
                target: "domain_probe::scheduler",
                "Progress receiver dropped, discarding report for {}",
                report.domain
            );
        }
    }

    fn report_completed(&self, _total: usize) {}
}
