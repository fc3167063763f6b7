//! Next-URL decision after a failed probe
//!
//! A pure function of the domain, the last failure and the last URL tried.
//! Rules are evaluated top to bottom and the first match decides; the result
//! is deduplicated, never contains the URL just tried, and drops plain-HTTP
//! URLs under `https_only`.

use url::Url;

use super::probe_types::ErrorCode;
use crate::utils::domain_utils::{base_domain, is_subdomain, is_www, strip_www};

/// Statuses signalling a gateway or CDN edge that could not reach the origin
#[must_use]
pub const fn is_gateway_status(status: u16) -> bool {
    matches!(status, 502 | 504 | 520..=530)
}

/// Scheme and host of the last URL tried
struct LastTry {
    https: bool,
    host: Option<String>,
}

impl LastTry {
    fn parse(last_url: &str) -> Self {
        match Url::parse(last_url) {
            Ok(url) => Self {
                https: url.scheme() != "http",
                host: url.host_str().map(str::to_ascii_lowercase),
            },
            Err(_) => Self {
                https: true,
                host: None,
            },
        }
    }

    fn scheme(&self) -> &'static str {
        if self.https { "https" } else { "http" }
    }

    fn is_www(&self) -> bool {
        self.host.as_deref().is_some_and(is_www)
    }
}

fn build_url(scheme: &str, host: &str) -> String {
    format!("{scheme}://{host}")
}

/// Ordered candidate URLs to try after a failure
///
/// # Arguments
/// * `domain` - The domain under scan; a leading `www.` is ignored
/// * `last_error` - Error class of the last attempt, if it failed with one
/// * `last_status` - HTTP status of the last attempt, if any
/// * `last_url` - The URL that was just tried
/// * `https_only` - Drop every `http://` candidate
#[must_use]
pub fn next_variants(
    domain: &str,
    last_error: Option<ErrorCode>,
    last_status: Option<u16>,
    last_url: &str,
    https_only: bool,
) -> Vec<String> {
    let bare = strip_www(&domain.to_ascii_lowercase()).to_string();
    let www = format!("www.{bare}");
    let last = LastTry::parse(last_url);

    let status = last_status.or(match last_error {
        Some(ErrorCode::Http(status)) => Some(status),
        _ => None,
    });

    let candidates = match (last_error, status) {
        (Some(ErrorCode::NameNotResolved), _) => {
            if last.is_www() {
                Vec::new()
            } else {
                vec![build_url("https", &www), build_url("http", &www)]
            }
        }
        (Some(ErrorCode::ConnectionRefused), _) => {
            if last.https {
                vec![
                    build_url("http", &bare),
                    build_url("http", &www),
                    build_url("https", &www),
                ]
            } else if !last.is_www() {
                vec![build_url("http", &www), build_url("https", &www)]
            } else {
                Vec::new()
            }
        }
        (Some(ErrorCode::ConnectionTimedOut), _) => {
            if last.is_www() {
                vec![build_url("http", &bare), build_url("http", &www)]
            } else {
                vec![
                    build_url("https", &www),
                    build_url("http", &bare),
                    build_url("http", &www),
                ]
            }
        }
        (Some(ErrorCode::BlockedByClient | ErrorCode::PageUnavailable), _) => Vec::new(),
        (Some(ErrorCode::CertificateError), _) => {
            // Same scheme only
            let toggled = if last.is_www() { &bare } else { &www };
            vec![build_url(last.scheme(), toggled)]
        }
        (_, Some(status)) if is_gateway_status(status) => {
            let (same_host, other_host) = if last.is_www() {
                (&www, &bare)
            } else {
                (&bare, &www)
            };
            let other_scheme = if last.https { "http" } else { "https" };
            vec![
                build_url(other_scheme, same_host),
                build_url(other_scheme, other_host),
                build_url(last.scheme(), other_host),
            ]
        }
        (_, Some(403)) if last.host.as_deref().is_some_and(is_subdomain) => {
            let host = last.host.as_deref().unwrap_or(&bare);
            let stripped = base_domain(host);
            let stripped_www = format!("www.{stripped}");
            vec![
                build_url("http", host),
                build_url("https", &stripped),
                build_url("http", &stripped),
                build_url("https", &stripped_www),
                build_url("http", &stripped_www),
            ]
        }
        _ => {
            let other_host = if last.is_www() { &bare } else { &www };
            vec![
                build_url(last.scheme(), other_host),
                build_url("http", &bare),
                build_url("http", &www),
            ]
        }
    };

    finalize(candidates, last_url, https_only)
}

/// Dedupe in order, drop the URL just tried and, if requested, plain HTTP
fn finalize(candidates: Vec<String>, last_url: &str, https_only: bool) -> Vec<String> {
    let last = normalize(last_url);
    let mut out: Vec<String> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if https_only && candidate.starts_with("http://") {
            continue;
        }
        if normalize(&candidate) == last || out.contains(&candidate) {
            continue;
        }
        out.push(candidate);
    }
    out
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_ascii_lowercase()
}
