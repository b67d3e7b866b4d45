use std::sync::Arc;
use std::time::Duration;

use gmocoin_sdk::auth::Credentials;
use gmocoin_sdk::config::GmoConfig;
use gmocoin_sdk::rest::{RestClient, RestError};
use httpmock::prelude::*;
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const TEST_API_KEY: &str = "test-api-key";
const TEST_API_SECRET: &str = "test-api-secret";

fn credentials() -> Credentials {
    Credentials::new(TEST_API_KEY, SecretString::new(TEST_API_SECRET.to_string()))
}

fn config_for(server: &MockServer) -> GmoConfig {
    GmoConfig {
        public_rest_url: server.base_url(),
        private_rest_url: server.base_url(),
        request_timeout: Duration::from_secs(2),
        ..GmoConfig::default()
    }
}

/// Reserves a local port with nothing listening on it.
async fn dead_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("read throwaway address");
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn dispatch_returns_one_ordered_slot_per_request() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/status");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0, "data": {"status": "OPEN"}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/ticker");
            then.status(200)
                .header("content-type", "application/json")
                .body("{not json");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/orderbooks");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0, "data": {"asks": [], "bids": []}}));
        })
        .await;

    let client = RestClient::new(Arc::new(config_for(&server)), credentials());
    let mut batch = client.batch();
    batch.status();
    batch.ticker();
    batch.orderbooks();

    let results = client.dispatch(batch).await;
    assert_eq!(results.len(), 3, "one slot per request");

    let status = results[0].as_ref().expect("status slot decodes");
    assert_eq!(status["data"]["status"], "OPEN");
    assert!(
        matches!(results[1], Err(RestError::Decode { .. })),
        "malformed ticker body becomes an error slot"
    );
    let orderbooks = results[2].as_ref().expect("orderbooks slot decodes");
    assert_eq!(orderbooks["status"], 0);
}

#[tokio::test]
async fn empty_response_body_yields_a_null_slot() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/status");
            then.status(200);
        })
        .await;

    let client = RestClient::new(Arc::new(config_for(&server)), credentials());
    let mut batch = client.batch();
    batch.status();

    let results = client.dispatch(batch).await;
    assert_eq!(results.len(), 1);
    assert_eq!(*results[0].as_ref().expect("empty body is not an error"), Value::Null);
}

#[tokio::test]
async fn empty_batch_performs_no_network_operation() {
    let server = MockServer::start_async().await;
    let any_request = server
        .mock_async(|when, then| {
            when.path_matches(Regex::new(".*").expect("valid regex"));
            then.status(200);
        })
        .await;

    let client = RestClient::new(Arc::new(config_for(&server)), credentials());
    let results = client.dispatch(client.batch()).await;

    assert!(results.is_empty());
    assert_eq!(any_request.hits_async().await, 0);
}

#[tokio::test]
async fn private_request_transmits_signed_headers() {
    let server = MockServer::start_async().await;
    let margin = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/account/margin")
                .header("API-KEY", TEST_API_KEY)
                .header_exists("API-TIMESTAMP")
                .header_exists("API-SIGN");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0, "data": {"availableAmount": "250000"}}));
        })
        .await;

    let client = RestClient::new(Arc::new(config_for(&server)), credentials());
    let mut batch = client.batch();
    batch.margin();

    let results = client.dispatch(batch).await;
    margin.assert_async().await;
    let margin = results[0].as_ref().expect("margin slot decodes");
    assert_eq!(margin["data"]["availableAmount"], "250000");
}

#[tokio::test]
async fn slow_member_is_abandoned_without_aborting_the_batch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/status");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0}))
                .delay(Duration::from_secs(5));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/ticker");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0, "data": []}));
        })
        .await;

    let config = GmoConfig {
        request_timeout: Duration::from_millis(200),
        ..config_for(&server)
    };
    let client = RestClient::new(Arc::new(config), credentials());
    let mut batch = client.batch();
    batch.status();
    batch.ticker();

    let results = client.dispatch(batch).await;
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Err(RestError::Timeout { .. })));
    assert!(results[1].is_ok(), "fast member keeps its result");
}

#[tokio::test]
async fn transport_failure_becomes_an_error_slot_and_the_client_recovers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/status");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0}));
        })
        .await;

    // Public base answers, private base points at a closed port.
    let config = GmoConfig {
        private_rest_url: dead_port_url().await,
        ..config_for(&server)
    };
    let client = RestClient::new(Arc::new(config), credentials());

    let mut batch = client.batch();
    batch.status();
    batch.margin();
    let results = client.dispatch(batch).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok(), "completed member survives the broken one");
    assert!(matches!(results[1], Err(RestError::Transport(_))));

    // The connection context was torn down; the next batch rebuilds it.
    let mut batch = client.batch();
    batch.status();
    let results = client.dispatch(batch).await;
    assert!(results[0].is_ok());
}

#[tokio::test]
async fn each_batch_is_independent_of_the_previous_dispatch() {
    let server = MockServer::start_async().await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/status");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": 0}));
        })
        .await;

    let client = RestClient::new(Arc::new(config_for(&server)), credentials());

    let mut first = client.batch();
    first.status();
    first.status();
    assert_eq!(client.dispatch(first).await.len(), 2);

    // Requests built after a dispatch can only land in a later batch.
    let mut second = client.batch();
    second.status();
    assert_eq!(client.dispatch(second).await.len(), 1);

    assert_eq!(status.hits_async().await, 3);
}
