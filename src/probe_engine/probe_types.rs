//! Core types for domain probing.
//!
//! This module contains the records that flow through the engine: validated
//! domains, scan tasks, per-attempt results, the terminal outcome of a scan
//! and the error types surfaced at the library boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::driver::DriverError;
use crate::utils::constants::MIN_DOMAIN_LENGTH;
use crate::utils::domain_utils::strip_www;

/// Reasons a string is not accepted as a probeable domain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("domain is empty")]
    Empty,
    #[error("domain '{0}' is shorter than {MIN_DOMAIN_LENGTH} characters")]
    TooShort(String),
    #[error("'{0}' contains a scheme, path, port or whitespace")]
    NotAHostname(String),
    #[error("'{0}' is an IP literal")]
    IpLiteral(String),
    #[error("'{0}' is an onion service")]
    Onion(String),
    #[error("'{0}' is a localhost name")]
    Localhost(String),
    #[error("'{0}' is not a valid multi-label hostname")]
    InvalidLabels(String),
}

/// A validated hostname (no scheme, no path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Validate and normalize a hostname
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        let host = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();

        if host.is_empty() {
            return Err(DomainError::Empty);
        }
        if host.contains("://")
            || host.contains(['/', '?', '#', '@'])
            || host.chars().any(char::is_whitespace)
        {
            return Err(DomainError::NotAHostname(host));
        }
        if host.starts_with('[') || host.parse::<std::net::IpAddr>().is_ok() {
            return Err(DomainError::IpLiteral(host));
        }
        if host.contains(':') {
            return Err(DomainError::NotAHostname(host));
        }
        match url::Host::parse(&host) {
            Ok(url::Host::Domain(_)) => {}
            Ok(url::Host::Ipv4(_) | url::Host::Ipv6(_)) => {
                return Err(DomainError::IpLiteral(host));
            }
            Err(_) => return Err(DomainError::InvalidLabels(host)),
        }
        if host.ends_with(".onion") {
            return Err(DomainError::Onion(host));
        }
        if host == "localhost" || host.ends_with(".localhost") {
            return Err(DomainError::Localhost(host));
        }
        if host.len() < MIN_DOMAIN_LENGTH {
            return Err(DomainError::TooShort(host));
        }

        let labels: Vec<&str> = host.split('.').collect();
        let labels_ok = labels.len() >= 2
            && labels.iter().all(|label| {
                !label.is_empty()
                    && label.len() <= 63
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            });
        if !labels_ok {
            return Err(DomainError::InvalidLabels(host));
        }

        Ok(Self(host))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Domain {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One unit of work for the scheduler: a domain plus its equivalent variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTask {
    pub original: Domain,
    /// Hosts that count as "the same domain" when judging the final URL
    pub candidate_variants: Vec<Domain>,
}

impl DomainTask {
    /// Build a task with www-expansion: variants are the bare and `www.` forms
    #[must_use]
    pub fn new(original: Domain) -> Self {
        let bare = strip_www(original.as_str()).to_string();
        let www = format!("www.{bare}");

        let candidate_variants = [bare, www]
            .iter()
            .filter_map(|host| Domain::parse(host).ok())
            .collect();

        Self {
            original,
            candidate_variants,
        }
    }

    /// Build a task with an explicit variant list
    #[must_use]
    pub fn with_variants(original: Domain, candidate_variants: Vec<Domain>) -> Self {
        Self {
            original,
            candidate_variants,
        }
    }

    /// Whether `host` is the original domain or one of its variants
    #[must_use]
    pub fn is_variant_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        host == self.original.as_str()
            || self.candidate_variants.iter().any(|v| v.as_str() == host)
    }
}

/// Closed set of failure classes a navigation can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum ErrorCode {
    NameNotResolved,
    ConnectionRefused,
    ConnectionTimedOut,
    BlockedByClient,
    ConnectionReset,
    CertificateError,
    AddressUnreachable,
    /// Navigation completed with a non-success HTTP status (1xx or >= 400)
    Http(u16),
    /// Navigation completed without any response for the requested URL
    NoResponse,
    /// No page could be obtained to navigate with; a local fault, not a
    /// property of the domain
    PageUnavailable,
    Unclassified,
}

impl ErrorCode {
    /// Failures that say nothing about whether the domain exists
    #[must_use]
    pub const fn is_not_evidence_of_death(&self) -> bool {
        matches!(
            self,
            Self::BlockedByClient | Self::CertificateError | Self::PageUnavailable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameNotResolved => f.write_str("ERR_NAME_NOT_RESOLVED"),
            Self::ConnectionRefused => f.write_str("ERR_CONNECTION_REFUSED"),
            Self::ConnectionTimedOut => f.write_str("ERR_CONNECTION_TIMED_OUT"),
            Self::BlockedByClient => f.write_str("ERR_BLOCKED_BY_CLIENT"),
            Self::ConnectionReset => f.write_str("ERR_CONNECTION_RESET"),
            Self::CertificateError => f.write_str("ERR_CERT_INVALID"),
            Self::AddressUnreachable => f.write_str("ERR_ADDRESS_UNREACHABLE"),
            Self::Http(status) => write!(f, "HTTP_{status}"),
            Self::NoResponse => f.write_str("NO_RESPONSE"),
            Self::PageUnavailable => f.write_str("PAGE_UNAVAILABLE"),
            Self::Unclassified => f.write_str("UNKNOWN_ERROR"),
        }
    }
}

/// Result of one navigation try, as produced by the probe executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,
    pub http_status: Option<u16>,
    pub final_url: Option<String>,
    pub error_code: Option<ErrorCode>,
    /// Human-readable explanation, always set on failure
    pub reason: Option<String>,
}

impl ProbeResult {
    #[must_use]
    pub fn failure(error_code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            http_status: None,
            final_url: None,
            error_code: Some(error_code),
            reason: Some(reason.into()),
        }
    }
}

/// One entry in a scan's append-only attempt log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeAttempt {
    pub url: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProbeAttempt {
    #[must_use]
    pub fn from_result(url: impl Into<String>, result: &ProbeResult) -> Self {
        Self {
            url: url.into(),
            succeeded: result.success,
            http_status: result.http_status,
            error_code: result.error_code,
            final_url: result.final_url.clone(),
            reason: result.reason.clone(),
        }
    }
}

/// Terminal classification of one domain task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Active,
    Dead {
        reason: String,
    },
    Redirect {
        final_domain: String,
        final_url: String,
        status_code: Option<u16>,
    },
    Inconclusive {
        reason: String,
    },
}

impl ScanOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dead { .. } => "dead",
            Self::Redirect { .. } => "redirect",
            Self::Inconclusive { .. } => "inconclusive",
        }
    }
}

/// Everything the engine emits for a finished domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub domain: Domain,
    #[serde(flatten)]
    pub outcome: ScanOutcome,
    pub attempts: Vec<ProbeAttempt>,
}

/// Errors surfaced by the engine outside of per-attempt failures
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Page driver error: {0}")]
    Driver(#[from] DriverError),
    #[error("Invalid domain: {0}")]
    Domain(#[from] DomainError),
    #[error("Probe error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `ProbeError`
pub type ProbeEngineResult<T> = Result<T, ProbeError>;
