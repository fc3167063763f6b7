//! Tests for the probe configuration builder

use domain_probe::config::ProbeConfig;
use std::time::Duration;

#[test]
fn test_builder_with_all_optional_fields() {
    let config = ProbeConfig::builder()
        .navigation_timeout_ms(8_000)
        .force_abort_timeout_ms(12_000)
        .page_reset_timeout_ms(1_500)
        .concurrency(32)
        .page_pool_size(16)
        .rate_limit(50, 2_000)
        .max_attempts_per_domain(4)
        .max_retries_per_error(1)
        .https_only(true)
        .ignore_similar_redirects(true)
        .headless(false)
        .build()
        .expect("valid config");

    assert_eq!(config.navigation_timeout(), Duration::from_secs(8));
    assert_eq!(config.force_abort_timeout(), Duration::from_secs(12));
    assert_eq!(config.page_reset_timeout(), Duration::from_millis(1_500));
    assert_eq!(config.concurrency(), 32);
    assert_eq!(config.page_pool_size(), 16);
    assert_eq!(config.max_requests_per_interval(), 50);
    assert_eq!(config.rate_interval(), Duration::from_secs(2));
    assert_eq!(config.max_attempts_per_domain(), 4);
    assert_eq!(config.max_retries_per_error(), 1);
    assert!(config.https_only());
    assert!(config.ignore_similar_redirects());
    assert!(!config.headless());
}

#[test]
fn test_builder_field_override() {
    let config = ProbeConfig::builder()
        .concurrency(2)
        .concurrency(6) // Override previous value
        .headless(false)
        .headless(true) // Override previous value
        .build()
        .expect("valid config");

    assert_eq!(config.concurrency(), 6);
    assert!(config.headless());
}

#[test]
fn test_invalid_combinations_rejected() {
    let cases = [
        ProbeConfig::builder().navigation_timeout_ms(0),
        ProbeConfig::builder().page_reset_timeout_ms(0),
        ProbeConfig::builder().rate_limit(0, 1_000),
        ProbeConfig::builder().rate_limit(10, 0),
        ProbeConfig::builder().max_attempts_per_domain(0),
        ProbeConfig::builder().page_pool_size(0),
    ];

    for builder in cases {
        assert!(builder.build().is_err());
    }
}

#[test]
fn test_config_roundtrips_through_json() {
    let config = ProbeConfig::builder()
        .concurrency(3)
        .https_only(true)
        .build()
        .expect("valid config");

    let json = serde_json::to_string(&config).expect("serializable");
    let restored: ProbeConfig = serde_json::from_str(&json).expect("deserializable");
    assert_eq!(restored, config);
}
