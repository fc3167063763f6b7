//! Probe Engine Module
//!
//! This module contains the concurrent probing engine: the worker-pool
//! scheduler, the per-domain scan state machine, the single-URL probe
//! executor and the pieces they share (rate limiter, variant strategy,
//! error classifier, progress reporting and teardown).

// Sub-modules
pub mod cleanup;
pub mod error_classifier;
pub mod page_timeout;
pub mod probe_executor;
pub mod probe_types;
pub mod progress;
pub mod rate_limiter;
pub mod scan_state;
pub mod scheduler;
pub mod variant_strategy;

// Re-exports for public API
pub use scheduler::Scheduler;

// Re-export scan and probe building blocks
pub use probe_executor::ProbeExecutor;
pub use scan_state::{DomainScan, ErrorTally, ScanState};
pub use variant_strategy::{is_gateway_status, next_variants};

// Re-export progress and cleanup types
pub use cleanup::CleanupResult;
pub use progress::{ChannelProgress, FnProgress, NoOpProgress, ProgressReporter};

// Re-export rate limiter types
pub use rate_limiter::{RateLimitDecision, RateLimiter};

// Re-export error classification
pub use error_classifier::{classify_driver_error, classify_error_text};

// Re-export core types
pub use probe_types::{
    Domain, DomainError, DomainTask, ErrorCode, ProbeAttempt, ProbeEngineResult, ProbeError,
    ProbeResult, ScanOutcome, ScanReport,
};
