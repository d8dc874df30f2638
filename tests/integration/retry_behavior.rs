//! Integration tests for retry, backoff and failure classification

use imf_data_client::TransportError;
use std::time::Duration;
use tokio::time::Instant;

use crate::support::{self, url, MockBackend, OVERLOAD_PAGE};

#[tokio::test(start_paused = true)]
async fn test_backoff_follows_powers_of_five() {
    let backend = MockBackend::new();
    backend
        .respond(url("Dataflow"), 200, OVERLOAD_PAGE)
        .respond(url("Dataflow"), 503, "")
        .json(url("Dataflow"), support::catalog());
    let config = support::test_config().with_backoff_unit(Duration::from_secs(1));
    let transport = support::transport(&backend, config);

    let start = Instant::now();
    let response = transport.fetch(&url("Dataflow")).await.unwrap();

    // 5s after the first failure, 25s after the second
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert!(start.elapsed() < Duration::from_secs(31));
    assert_eq!(response.status_code, 200);
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_report_url_status_and_excerpt() {
    let backend = MockBackend::new();
    backend.respond(url("Dataflow"), 200, OVERLOAD_PAGE);
    let transport = support::transport(&backend, support::test_config());

    let err = transport.fetch(&url("Dataflow")).await.unwrap_err();

    match &err {
        TransportError::RetriesExhausted {
            url: failed,
            status,
            content,
            attempts,
        } => {
            assert_eq!(failed, &url("Dataflow"));
            assert_eq!(*status, Some(200));
            assert_eq!(content, "Rejected: Bandwidth exceeded");
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.to_string().contains("GKey"));
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn test_undecodable_body_is_retried() {
    let backend = MockBackend::new();
    backend
        .respond(url("Dataflow"), 200, "{\"Structure\": {\"Dataf")
        .json(url("Dataflow"), support::catalog());
    let transport = support::transport(&backend, support::test_config());

    let response = transport.fetch(&url("Dataflow")).await.unwrap();
    assert!(response.json.get("Structure").is_some());
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_query_too_large_is_immediate() {
    let backend = MockBackend::new();
    backend.respond(
        url("CompactData/IFS/M.."),
        200,
        "<html><body>Too many parameters in the request</body></html>",
    );
    let transport = support::transport(&backend, support::test_config());

    let err = transport.fetch(&url("CompactData/IFS/M..")).await.unwrap_err();
    assert!(matches!(err, TransportError::QueryTooLarge { .. }));
    assert!(err.to_string().contains("narrow your request"));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_server_error_is_missing_parameter() {
    let backend = MockBackend::new();
    backend.respond(url("CompactData/IFS/.."), 500, "<html><p>Object reference not set</p></html>");
    let transport = support::transport(&backend, support::test_config());

    let err = transport.fetch(&url("CompactData/IFS/..")).await.unwrap_err();
    assert!(matches!(err, TransportError::MissingParameter { status: 500, .. }));
    assert!(err.to_string().contains("required parameters"));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_network_failures_are_retried() {
    let backend = MockBackend::new();
    backend.fail(url("Dataflow")).json(url("Dataflow"), support::catalog());
    let transport = support::transport(&backend, support::test_config());

    transport.fetch(&url("Dataflow")).await.unwrap();
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_per_call_attempt_budget() {
    let backend = MockBackend::new();
    backend.respond(url("Dataflow"), 502, "");
    let transport = support::transport(&backend, support::test_config());

    let err = transport
        .fetch_with_attempts(&url("Dataflow"), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::RetriesExhausted { attempts: 5, .. }));
    assert_eq!(backend.call_count(), 5);
}

#[tokio::test]
async fn test_user_agent_and_app_name() {
    let backend = MockBackend::new();
    backend.json(url("Dataflow"), support::catalog());
    let config = support::test_config().with_app_name("econ-dashboard/2.1").unwrap();
    let transport = support::transport(&backend, config);

    transport.fetch(&url("Dataflow")).await.unwrap();
    assert_eq!(backend.user_agents(), vec!["econ-dashboard/2.1".to_string()]);
}
