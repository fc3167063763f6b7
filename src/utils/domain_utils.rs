//! Hostname helpers shared by the variant strategy and the scan machine.

use url::Url;

/// Extract the lowercase host from a URL string
///
/// Returns `None` for unparseable URLs or URLs without a host.
#[must_use]
pub fn host_of(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()?
        .host_str()
        .map(str::to_ascii_lowercase)
}

/// Strip a single leading `www.` label
#[must_use]
pub fn strip_www(host: &str) -> &str {
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest,
        _ => host,
    }
}

#[must_use]
pub fn is_www(host: &str) -> bool {
    strip_www(host).len() != host.len()
}

/// Approximate registrable ("apex") domain of a host
///
/// Strips an optional leading `www.` and keeps the last two labels. This does
/// not consult the public suffix list, so `shop.example.co.uk` yields
/// `co.uk`.
#[must_use]
pub fn base_domain(host: &str) -> String {
    let host = strip_www(host.trim_end_matches('.'));
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

/// Whether two hosts share the same approximate base domain
#[must_use]
pub fn same_base_domain(a: &str, b: &str) -> bool {
    base_domain(&a.to_ascii_lowercase()) == base_domain(&b.to_ascii_lowercase())
}

/// Whether a host (ignoring a leading `www.`) has more labels than its base domain
#[must_use]
pub fn is_subdomain(host: &str) -> bool {
    strip_www(host).split('.').count() > 2
}
