//! Integration tests for the idle-gap rate limiter

use imf_data_client::transport::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::support::{self, url, MockBackend};

#[tokio::test(start_paused = true)]
async fn test_back_to_back_fetches_respect_min_wait() {
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let config = support::test_config().with_min_wait(Duration::from_millis(1500));
    let transport = support::transport(&backend, config);

    let start = Instant::now();
    transport.fetch(&url("Dataflow")).await.unwrap();
    transport.fetch(&url("Dataflow")).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(1500));
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shared_limiter_is_global_across_transports() {
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));

    let first = support::transport(&backend, support::test_config()).with_rate_limiter(limiter.clone());
    let second = support::transport(&backend, support::test_config()).with_rate_limiter(limiter);

    let start = Instant::now();
    let a = tokio::spawn(async move { first.fetch(&url("Dataflow")).await.map(|_| ()) });
    let b = tokio::spawn(async move { second.fetch(&url("Dataflow")).await.map(|_| ()) });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_process_wide_limiter_honors_configured_wait() {
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let config = support::test_config().with_min_wait(Duration::from_secs(7));
    let transport = support::transport(&backend, config)
        .with_rate_limiter(imf_data_client::transport::shared_resources::global_rate_limiter());

    let start = Instant::now();
    transport.fetch(&url("Dataflow")).await.unwrap();
    transport.fetch(&url("Dataflow")).await.unwrap();

    assert_eq!(transport.min_wait(), Duration::from_secs(7));
    assert!(start.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_cache_hits_skip_the_limiter() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let config = support::test_config()
        .with_min_wait(Duration::from_secs(10))
        .with_cache(imf_data_client::CacheConfig::in_dir(dir.path()));
    let transport = support::transport(&backend, config);

    transport.fetch(&url("Dataflow")).await.unwrap();
    let start = Instant::now();
    let cached = transport.fetch(&url("Dataflow")).await.unwrap();

    assert!(cached.from_cache);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(backend.call_count(), 1);
}
