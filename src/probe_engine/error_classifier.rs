//! Maps unstructured navigation failure text to an `ErrorCode`.
//!
//! Page drivers report failures as free text (Chromium's `net::ERR_*`
//! strings, timeout messages). The classifier is a single ordered rule table:
//! the first rule with a matching needle wins, so more specific signals are
//! listed before generic ones like `timeout`.

use super::probe_types::ErrorCode;
use crate::driver::DriverError;

/// Ordered signal → kind rules; needles are matched case-insensitively
const RULES: &[(&[&str], ErrorCode)] = &[
    (
        &["err_blocked_by_client", "err_blocked_by_response"],
        ErrorCode::BlockedByClient,
    ),
    (
        &[
            "err_name_not_resolved",
            "err_name_resolution_failed",
            "enotfound",
            "dns",
        ],
        ErrorCode::NameNotResolved,
    ),
    (
        &["err_connection_refused", "econnrefused"],
        ErrorCode::ConnectionRefused,
    ),
    (
        &[
            "err_connection_reset",
            "err_connection_closed",
            "err_empty_response",
            "econnreset",
        ],
        ErrorCode::ConnectionReset,
    ),
    (
        &["err_cert_", "err_ssl_", "ssl_protocol", "certificate"],
        ErrorCode::CertificateError,
    ),
    (
        &["err_address_unreachable", "err_network_unreachable"],
        ErrorCode::AddressUnreachable,
    ),
    (
        &[
            "err_connection_timed_out",
            "err_timed_out",
            "timeout",
            "timed out",
        ],
        ErrorCode::ConnectionTimedOut,
    ),
];

/// Classify raw failure text
#[must_use]
pub fn classify_error_text(text: &str) -> ErrorCode {
    let lowered = text.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map_or(ErrorCode::Unclassified, |(_, code)| *code)
}

/// Classify a driver error raised during navigation
#[must_use]
pub fn classify_driver_error(error: &DriverError) -> ErrorCode {
    match error {
        DriverError::Timeout { .. } => ErrorCode::ConnectionTimedOut,
        other => classify_error_text(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_chromium_net_errors() {
        assert_eq!(
            classify_error_text("net::ERR_NAME_NOT_RESOLVED at https://example.com"),
            ErrorCode::NameNotResolved
        );
        assert_eq!(
            classify_error_text("net::ERR_CONNECTION_REFUSED"),
            ErrorCode::ConnectionRefused
        );
        assert_eq!(
            classify_error_text("net::ERR_CONNECTION_TIMED_OUT"),
            ErrorCode::ConnectionTimedOut
        );
        assert_eq!(
            classify_error_text("net::ERR_BLOCKED_BY_CLIENT"),
            ErrorCode::BlockedByClient
        );
        assert_eq!(
            classify_error_text("net::ERR_CONNECTION_RESET"),
            ErrorCode::ConnectionReset
        );
        assert_eq!(
            classify_error_text("net::ERR_CERT_AUTHORITY_INVALID"),
            ErrorCode::CertificateError
        );
        assert_eq!(
            classify_error_text("net::ERR_SSL_PROTOCOL_ERROR"),
            ErrorCode::CertificateError
        );
        assert_eq!(
            classify_error_text("net::ERR_ADDRESS_UNREACHABLE"),
            ErrorCode::AddressUnreachable
        );
        assert_eq!(
            classify_error_text("net::ERR_ABORTED"),
            ErrorCode::Unclassified
        );
    }

    #[test]
    fn test_rule_order_prefers_specific_signals() {
        // Mentions both a DNS failure and a timeout; DNS is listed first
        assert_eq!(
            classify_error_text("dns lookup timed out"),
            ErrorCode::NameNotResolved
        );
        assert_eq!(
            classify_error_text("Navigation Timeout Exceeded: 30000ms"),
            ErrorCode::ConnectionTimedOut
        );
    }

    #[test]
    fn test_driver_timeout_is_timed_out() {
        let error = DriverError::Timeout {
            operation: "Navigation".to_string(),
            after: Duration::from_secs(30),
        };
        assert_eq!(classify_driver_error(&error), ErrorCode::ConnectionTimedOut);
        assert_eq!(
            classify_driver_error(&DriverError::Navigation("net::ERR_NAME_NOT_RESOLVED".into())),
            ErrorCode::NameNotResolved
        );
    }
}
