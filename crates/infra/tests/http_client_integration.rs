//! Integration tests for the resilient HTTP client against a mock upstream
//!
//! Covers breaker accounting per logical call, recovery through the reset
//! window, and classification of timeouts, rate limits and transport errors.

mod support;

use std::net::TcpListener;
use std::time::Duration;

use clinix_common::{CircuitState, MockClock};
use clinix_infra::{HttpClientError, HttpErrorCategory, ResilientHttpClient};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{fast_client_config, short_timeout};

#[tokio::test]
async fn breaker_opens_after_threshold_and_stops_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slots"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let client = ResilientHttpClient::new(fast_client_config(server.uri(), 1)).unwrap();

    for _ in 0..5 {
        let err = client.get::<Value>("/slots", None).await.unwrap_err();
        assert_eq!(err.category(), HttpErrorCategory::Server);
    }
    assert_eq!(client.circuit_breaker_state().state, CircuitState::Open);

    let err = client.get::<Value>("/slots", None).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn retries_inside_one_call_count_as_a_single_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let client = ResilientHttpClient::new(fast_client_config(server.uri(), 3)).unwrap();
    let err = client.get::<Value>("/", None).await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    let state = client.circuit_breaker_state();
    assert_eq!(state.state, CircuitState::Closed);
    assert_eq!(state.failure_count, 1);
    assert!(state.last_failure_time.is_some());
}

#[tokio::test]
async fn breaker_recovers_after_reset_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let clock = MockClock::new();
    let client =
        ResilientHttpClient::with_clock(fast_client_config(server.uri(), 1), clock.clone()).unwrap();

    for _ in 0..5 {
        client.get::<Value>("/", None).await.unwrap_err();
    }
    assert_eq!(client.circuit_breaker_state().state, CircuitState::Open);

    clock.advance(Duration::from_secs(29));
    assert!(client.get::<Value>("/", None).await.unwrap_err().is_circuit_open());

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    clock.advance(Duration::from_secs(2));
    let response = client.get::<Value>("/", None).await.unwrap();

    assert_eq!(response.data, json!({ "ok": true }));
    let state = client.circuit_breaker_state();
    assert_eq!(state.state, CircuitState::Closed);
    assert_eq!(state.failure_count, 0);
}

#[tokio::test]
async fn failed_probe_reopens_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(6)
        .mount(&server)
        .await;

    let clock = MockClock::new();
    let client =
        ResilientHttpClient::with_clock(fast_client_config(server.uri(), 1), clock.clone()).unwrap();

    for _ in 0..5 {
        client.get::<Value>("/", None).await.unwrap_err();
    }
    clock.advance(Duration::from_secs(31));

    let probe = client.get::<Value>("/", None).await.unwrap_err();
    assert_eq!(probe.status(), Some(500));
    assert_eq!(client.circuit_breaker_state().state, CircuitState::Open);
    assert!(client.get::<Value>("/", None).await.unwrap_err().is_circuit_open());
}

#[tokio::test]
async fn slow_upstream_times_out_and_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let config = short_timeout(fast_client_config(server.uri(), 2), Duration::from_millis(50));
    let client = ResilientHttpClient::new(config).unwrap();
    let err = client.get::<Value>("/", None).await.unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert_eq!(client.circuit_breaker_state().failure_count, 1);
}

#[tokio::test]
async fn rate_limited_calls_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&server)
        .await;

    let client = ResilientHttpClient::new(fast_client_config(server.uri(), 3)).unwrap();
    let err = client.post::<_, Value>("/messages", &json!({}), None).await.unwrap_err();

    assert_eq!(err.category(), HttpErrorCategory::RateLimit);
    assert_eq!(err, HttpClientError::Status { status: 429, message: "slow down".into() });
}

#[tokio::test]
async fn client_errors_are_not_retried_but_trip_the_breaker_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResilientHttpClient::new(fast_client_config(server.uri(), 3)).unwrap();
    let err = client.get::<Value>("/events/missing", None).await.unwrap_err();

    assert_eq!(err.category(), HttpErrorCategory::Client);
    assert_eq!(err, HttpClientError::Status { status: 404, message: "Not Found".into() });
    assert_eq!(client.circuit_breaker_state().failure_count, 1);
}

#[tokio::test]
async fn unreachable_upstream_is_a_network_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client =
        ResilientHttpClient::new(fast_client_config(format!("http://127.0.0.1:{port}"), 2)).unwrap();
    let err = client.get::<Value>("/", None).await.unwrap_err();

    assert_eq!(err.category(), HttpErrorCategory::Network, "got {err:?}");
    assert_eq!(client.circuit_breaker_state().failure_count, 1);
}

#[tokio::test]
async fn reset_closes_an_open_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ResilientHttpClient::new(fast_client_config(server.uri(), 1)).unwrap();
    for _ in 0..5 {
        client.get::<Value>("/", None).await.unwrap_err();
    }
    assert_eq!(client.circuit_breaker_state().state, CircuitState::Open);

    client.reset_circuit_breaker();

    let state = client.circuit_breaker_state();
    assert_eq!(state.state, CircuitState::Closed);
    assert_eq!(state.failure_count, 0);
    assert_eq!(client.get::<Value>("/", None).await.unwrap_err().status(), Some(500));
}
