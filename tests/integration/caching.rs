//! Integration tests for the durable response cache

use imf_data_client::transport::ResponseCache;
use imf_data_client::CacheConfig;
use std::time::Duration;

use crate::support::{self, url, MockBackend, OVERLOAD_PAGE};

#[tokio::test]
async fn test_successful_response_is_saved_and_served() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let config = support::test_config().with_cache(CacheConfig::in_dir(dir.path()));
    let transport = support::transport(&backend, config);

    let fresh = transport.fetch(&url("Dataflow")).await.unwrap();
    let cached = transport.fetch(&url("Dataflow")).await.unwrap();

    assert!(!fresh.from_cache);
    assert!(cached.from_cache);
    assert_eq!(fresh.json, cached.json);
    assert_eq!(backend.call_count(), 1);

    let entry_path = dir
        .path()
        .join(format!("{}.json", ResponseCache::key_for(&url("Dataflow"))));
    assert!(entry_path.exists());
}

#[tokio::test]
async fn test_cache_is_keyed_by_url() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    backend.json(url("DataStructure/PCPS"), support::pcps_structure());
    let config = support::test_config().with_cache(CacheConfig::in_dir(dir.path()));
    let transport = support::transport(&backend, config);

    transport.fetch(&url("Dataflow")).await.unwrap();
    let other = transport.fetch(&url("DataStructure/PCPS")).await.unwrap();

    assert!(!other.from_cache);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    backend.respond(url("Dataflow"), 200, OVERLOAD_PAGE);
    let config = support::test_config()
        .with_max_attempts(1)
        .unwrap()
        .with_cache(CacheConfig::in_dir(dir.path()));
    let transport = support::transport(&backend, config);

    assert!(transport.fetch(&url("Dataflow")).await.is_err());
    assert!(!ResponseCache::new(dir.path(), Duration::from_secs(60))
        .path_for(&url("Dataflow"))
        .exists());
}

#[tokio::test]
async fn test_write_only_cache_never_serves() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let cache = CacheConfig {
        read: false,
        ..CacheConfig::in_dir(dir.path())
    };
    let transport = support::transport(&backend, support::test_config().with_cache(cache));

    transport.fetch(&url("Dataflow")).await.unwrap();
    let second = transport.fetch(&url("Dataflow")).await.unwrap();

    assert!(!second.from_cache);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_corrupt_entry_falls_back_to_network() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));
    std::fs::write(cache.path_for(&url("Dataflow")), "garbage").unwrap();
    let config = support::test_config().with_cache(CacheConfig::in_dir(dir.path()));
    let transport = support::transport(&backend, config);

    let response = transport.fetch(&url("Dataflow")).await.unwrap();
    assert!(!response.from_cache);
    assert_eq!(backend.call_count(), 1);
}
