//! Page pool lifecycle against the scripted driver

use domain_probe::{PageHandle, PageKind, PagePool};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

mod common;
use common::{ScriptedDriver, ok};

#[tokio::test]
async fn test_repeated_acquire_release_never_grows_pool() {
    let driver = ScriptedDriver::builder().build();
    let stats = Arc::clone(&driver.stats);
    let pool = PagePool::new(driver, 1, Duration::from_secs(1));
    assert_eq!(pool.initialize().await, Ok(1));

    for _ in 0..25 {
        let page = pool.acquire().await.expect("page available");
        assert_eq!(page.kind(), PageKind::Pooled);
        page.release().await;
    }

    assert_eq!(stats.pages_created.load(Ordering::SeqCst), 1);
    assert_eq!(stats.pages_closed.load(Ordering::SeqCst), 0);
    let pool_stats = pool.stats().await;
    assert_eq!(pool_stats.created, 1);
    assert_eq!(pool_stats.transient_created, 0);
    assert_eq!(pool_stats.available, 1);
}

#[tokio::test]
async fn test_transient_pages_are_closed_not_pooled() {
    let driver = ScriptedDriver::builder().build();
    let stats = Arc::clone(&driver.stats);
    let pool = PagePool::new(driver, 1, Duration::from_secs(1));
    pool.initialize().await.expect("pool init");

    let held: Vec<_> = {
        let mut pages = Vec::new();
        for _ in 0..4 {
            pages.push(pool.acquire().await.expect("page available"));
        }
        pages
    };
    let transient = held
        .iter()
        .filter(|page| page.kind() == PageKind::Transient)
        .count();
    assert_eq!(transient, 3);
    assert_eq!(pool.stats().await.in_use, 4);

    for page in held {
        page.release().await;
    }

    assert_eq!(stats.pages_closed.load(Ordering::SeqCst), 3);
    let pool_stats = pool.stats().await;
    assert_eq!(pool_stats.available, 1);
    assert_eq!(pool_stats.in_use, 0);
}

#[tokio::test]
async fn test_checked_out_page_navigates() {
    let driver = ScriptedDriver::builder()
        .route("https://example.com", ok())
        .build();
    let pool = PagePool::new(driver, 1, Duration::from_secs(1));

    // Lazily created without initialize
    let mut page = pool.acquire().await.expect("page available");
    let response = page
        .page_mut()
        .expect("page present")
        .navigate("https://example.com", Duration::from_secs(1))
        .await
        .expect("scripted success");
    assert_eq!(response.status, Some(200));
    page.release().await;

    assert_eq!(pool.stats().await.available, 1);
}

#[tokio::test]
async fn test_dropped_guard_returns_page() {
    let driver = ScriptedDriver::builder().build();
    let pool = PagePool::new(driver, 1, Duration::from_secs(1));
    pool.initialize().await.expect("pool init");

    drop(pool.acquire().await.expect("page available"));
    // Release runs on a spawned task
    tokio::time::sleep(Duration::from_millis(20)).await;

    let stats = pool.stats().await;
    assert_eq!(stats.available, 1);
    assert_eq!(stats.in_use, 0);
}

#[tokio::test]
async fn test_destroy_closes_everything_idle() {
    let driver = ScriptedDriver::builder().build();
    let stats = Arc::clone(&driver.stats);
    let pool = PagePool::new(driver, 3, Duration::from_secs(1));
    pool.initialize().await.expect("pool init");

    assert_eq!(pool.destroy().await, Ok(3));
    assert!(pool.is_shutdown());
    assert_eq!(stats.pages_closed.load(Ordering::SeqCst), 3);
    assert!(pool.acquire().await.is_err());
}
