//! Per-domain scan state machine
//!
//! A scan starts at `https://<domain>` and moves through
//! `Start → Attempting → {Succeeded | Retrying | Exhausted}`. Attempts are
//! strictly sequential; every one is appended to the scan's attempt log. A
//! scan always ends in exactly one `ScanOutcome`.

use log::{debug, info, warn};
use std::collections::HashMap;

use super::probe_executor::ProbeExecutor;
use super::probe_types::{DomainTask, ErrorCode, ProbeAttempt, ScanOutcome, ScanReport};
use super::progress::ProgressReporter;
use super::variant_strategy::next_variants;
use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::utils::domain_utils::{host_of, same_base_domain};

/// Retry count per failure class within one scan
#[derive(Debug, Clone, Default)]
pub struct ErrorTally {
    counts: HashMap<ErrorCode, u32>,
}

impl ErrorTally {
    /// Count one more failure of `code`, returning the new count
    pub fn record(&mut self, code: ErrorCode) -> u32 {
        let count = self.counts.entry(code).or_insert(0);
        *count += 1;
        *count
    }

    #[must_use]
    pub fn count(&self, code: ErrorCode) -> u32 {
        self.counts.get(&code).copied().unwrap_or(0)
    }
}

/// Scan machine states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Start,
    Attempting { url: String },
    Retrying {
        last_url: String,
        error_code: ErrorCode,
        http_status: Option<u16>,
    },
    Succeeded(ScanOutcome),
    Exhausted,
}

/// One domain's scan
pub struct DomainScan<'a, D: PageDriver, P: ProgressReporter> {
    task: &'a DomainTask,
    executor: &'a ProbeExecutor<D>,
    config: &'a ProbeConfig,
    reporter: &'a P,
    attempts: Vec<ProbeAttempt>,
    tally: ErrorTally,
}

impl<'a, D: PageDriver, P: ProgressReporter> DomainScan<'a, D, P> {
    pub fn new(
        task: &'a DomainTask,
        executor: &'a ProbeExecutor<D>,
        config: &'a ProbeConfig,
        reporter: &'a P,
    ) -> Self {
        Self {
            task,
            executor,
            config,
            reporter,
            attempts: Vec::new(),
            tally: ErrorTally::default(),
        }
    }

    /// Drive the machine to a terminal state
    pub async fn run(mut self) -> ScanReport {
        self.reporter.report_scan_started(&self.task.original);
        let mut state = ScanState::Start;

        loop {
            state = match state {
                ScanState::Start => ScanState::Attempting {
                    url: format!("https://{}", self.task.original),
                },
                ScanState::Attempting { url } => self.attempt(url).await,
                ScanState::Retrying {
                    last_url,
                    error_code,
                    http_status,
                } => self.retry(&last_url, error_code, http_status),
                ScanState::Succeeded(outcome) => return self.finish(outcome),
                ScanState::Exhausted => {
                    let outcome = self.exhausted_outcome();
                    return self.finish(outcome);
                }
            };
        }
    }

    async fn attempt(&mut self, url: String) -> ScanState {
        let result = self
            .executor
            .probe(
                &url,
                self.config.navigation_timeout(),
                self.config.force_abort_timeout(),
            )
            .await;

        let attempt = ProbeAttempt::from_result(url.clone(), &result);
        self.reporter.report_attempt(&self.task.original, &attempt);
        self.attempts.push(attempt);

        if result.success {
            let final_url = result.final_url.unwrap_or_else(|| url.clone());
            return ScanState::Succeeded(self.success_outcome(final_url, result.http_status));
        }

        let error_code = result.error_code.unwrap_or(ErrorCode::Unclassified);
        debug!(
            target: "domain_probe::scan",
            "{}: attempt {} on {} failed with {}",
            self.task.original,
            self.attempts.len(),
            url,
            error_code
        );

        ScanState::Retrying {
            last_url: url,
            error_code,
            http_status: result.http_status,
        }
    }

    fn retry(
        &mut self,
        last_url: &str,
        error_code: ErrorCode,
        http_status: Option<u16>,
    ) -> ScanState {
        if error_code == ErrorCode::PageUnavailable {
            warn!(
                target: "domain_probe::scan",
                "{}: no page available, abandoning scan",
                self.task.original
            );
            return ScanState::Exhausted;
        }

        let count = self.tally.record(error_code);
        if count > self.config.max_retries_per_error() {
            debug!(
                target: "domain_probe::scan",
                "{}: {} seen {} times, giving up",
                self.task.original, error_code, count
            );
            return ScanState::Exhausted;
        }

        let attempted = u32::try_from(self.attempts.len()).unwrap_or(u32::MAX);
        if attempted >= self.config.max_attempts_per_domain() {
            debug!(
                target: "domain_probe::scan",
                "{}: attempt budget of {} spent",
                self.task.original,
                self.config.max_attempts_per_domain()
            );
            return ScanState::Exhausted;
        }

        let candidates = next_variants(
            self.task.original.as_str(),
            Some(error_code),
            http_status,
            last_url,
            self.config.https_only(),
        );

        match candidates.into_iter().find(|url| !self.already_tried(url)) {
            Some(url) => ScanState::Attempting { url },
            None => ScanState::Exhausted,
        }
    }

    fn already_tried(&self, url: &str) -> bool {
        let url = url.trim_end_matches('/');
        self.attempts
            .iter()
            .any(|attempt| attempt.url.trim_end_matches('/').eq_ignore_ascii_case(url))
    }

    /// Active unless the final host is a different domain
    fn success_outcome(&self, final_url: String, status_code: Option<u16>) -> ScanOutcome {
        let Some(final_host) = host_of(&final_url) else {
            return ScanOutcome::Active;
        };

        if self.task.is_variant_host(&final_host) {
            return ScanOutcome::Active;
        }

        if self.config.ignore_similar_redirects()
            && same_base_domain(self.task.original.as_str(), &final_host)
        {
            debug!(
                target: "domain_probe::scan",
                "{}: redirect to {} shares the base domain, treating as active",
                self.task.original, final_host
            );
            return ScanOutcome::Active;
        }

        ScanOutcome::Redirect {
            final_domain: final_host,
            final_url,
            status_code,
        }
    }

    /// Dead unless some attempt failed in a way that says nothing about the domain
    ///
    /// The first such failure, in attempt order, names the reason.
    fn exhausted_outcome(&self) -> ScanOutcome {
        let reason = self
            .attempts
            .last()
            .map(|attempt| match (&attempt.reason, attempt.error_code) {
                (Some(reason), _) => reason.clone(),
                (None, Some(code)) => code.to_string(),
                (None, None) => format!("{} failed", attempt.url),
            })
            .unwrap_or_else(|| "no attempts made".to_string());

        let interference = self
            .attempts
            .iter()
            .filter_map(|attempt| attempt.error_code)
            .find(ErrorCode::is_not_evidence_of_death);

        match interference {
            Some(code) => ScanOutcome::Inconclusive {
                reason: format!("{}: {reason}", interference_label(code)),
            },
            None => ScanOutcome::Dead { reason },
        }
    }

    fn finish(self, outcome: ScanOutcome) -> ScanReport {
        info!(
            target: "domain_probe::scan",
            "{}: {} after {} attempt(s)",
            self.task.original,
            outcome.label(),
            self.attempts.len()
        );

        ScanReport {
            domain: self.task.original.clone(),
            outcome,
            attempts: self.attempts,
        }
    }
}

fn interference_label(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::BlockedByClient => "blocked by client",
        ErrorCode::CertificateError => "certificate error",
        ErrorCode::PageUnavailable => "no page available",
        _ => "inconclusive",
    }
}
