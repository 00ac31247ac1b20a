//! Unit tests for the catalog client's retry budget

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tmdb_etl::config::RetryPolicy;
use tmdb_etl::fetcher::{FetcherError, TmdbHttpClient};

use crate::support::{self, network_error, ok, status, MockTransport, BASE_URL};

const PATH: &str = "/movie/popular";

#[tokio::test]
async fn test_rate_limit_then_success_returns_body() {
    let transport = Arc::new(MockTransport::new().route(
        PATH,
        vec![status(429), ok(json!({"page": 1, "results": []}))],
    ));
    let client = support::client(transport.clone(), 3);

    let body: Value = client.fetch(PATH, &[]).await.unwrap();
    assert_eq!(body["page"], 1);
    assert_eq!(transport.count(PATH), 2);
}

#[tokio::test]
async fn test_endless_rate_limit_terminates() {
    // The script repeats its last entry, so every attempt sees 429.
    let transport = Arc::new(MockTransport::new().route(PATH, vec![status(429)]));
    let client = support::client(transport.clone(), 4);

    let err = client.fetch(PATH, &[]).await.unwrap_err();
    assert_eq!(
        err,
        FetcherError::ApiRequestExhausted {
            endpoint: PATH.to_string(),
            last_status: Some(429),
        }
    );
    assert_eq!(transport.count(PATH), 4);
}

#[tokio::test]
async fn test_three_server_errors_exhaust_default_budget() {
    let transport = Arc::new(MockTransport::new().route(PATH, vec![status(503)]));
    let client = support::client(transport.clone(), 3);

    let err = client.fetch(PATH, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        FetcherError::ApiRequestExhausted {
            last_status: Some(503),
            ..
        }
    ));
    assert_eq!(transport.count(PATH), 3);
}

#[tokio::test]
async fn test_mixed_failures_share_one_budget() {
    let transport = Arc::new(MockTransport::new().route(
        PATH,
        vec![status(429), status(500), status(429), ok(json!({}))],
    ));
    let client = support::client(transport.clone(), 3);

    let err = client.fetch(PATH, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        FetcherError::ApiRequestExhausted {
            last_status: Some(429),
            ..
        }
    ));
    assert_eq!(transport.count(PATH), 3);
}

#[tokio::test]
async fn test_network_failure_is_retried() {
    let transport = Arc::new(
        MockTransport::new().route(PATH, vec![network_error(), ok(json!({"ok": true}))]),
    );
    let client = support::client(transport.clone(), 2);

    let body = client.fetch(PATH, &[]).await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(transport.count(PATH), 2);
}

#[tokio::test]
async fn test_not_found_exhausts_with_status() {
    let transport = Arc::new(MockTransport::new());
    let client = support::client(transport.clone(), 2);

    let err = client.fetch("/movie/1", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        FetcherError::ApiRequestExhausted {
            last_status: Some(404),
            ..
        }
    ));
}

#[tokio::test]
async fn test_single_attempt_budget() {
    let transport = Arc::new(MockTransport::new().route(PATH, vec![status(500), ok(json!({}))]));
    let client = support::client(transport.clone(), 1);

    assert!(client.fetch(PATH, &[]).await.is_err());
    assert_eq!(transport.count(PATH), 1);
}

#[tokio::test]
async fn test_api_key_sent_as_query_param() {
    let transport = Arc::new(MockTransport::new().route(PATH, vec![ok(json!({}))]));
    let client = support::client(transport.clone(), 1);

    client
        .fetch(PATH, &[("language", "en-US".to_string())])
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.param("api_key"), Some("test-key"));
    assert_eq!(request.param("language"), Some("en-US"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_its_own_backoff() {
    let transport = Arc::new(MockTransport::new().route(PATH, vec![status(429), ok(json!({}))]));
    let policy = RetryPolicy {
        max_attempts: 3,
        retry_delay: Duration::from_millis(100),
        rate_limit_backoff: Duration::from_secs(2),
    };
    let client = TmdbHttpClient::new(transport, BASE_URL, "test-key", policy);

    let started = tokio::time::Instant::now();
    client.fetch(PATH, &[]).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_no_wait_after_final_attempt() {
    let transport = Arc::new(MockTransport::new().route(PATH, vec![status(500)]));
    let policy = RetryPolicy {
        max_attempts: 2,
        retry_delay: Duration::from_secs(1),
        rate_limit_backoff: Duration::from_secs(5),
    };
    let client = TmdbHttpClient::new(transport, BASE_URL, "test-key", policy);

    let started = tokio::time::Instant::now();
    client.fetch(PATH, &[]).await.unwrap_err();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
}
