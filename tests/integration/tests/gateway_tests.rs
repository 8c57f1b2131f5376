//! Gateway Integration Tests
//!
//! Each test starts a gateway on an ephemeral port and talks to it over a
//! real WebSocket.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use hub_common::{AppConfig, HeartbeatConfig};
use hub_gateway::NewMessageEvent;
use integration_tests::{fixtures, test_config, TestServer};
use reqwest::StatusCode;

// ============================================================================
// Health Check
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/health").await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[tokio::test]
async fn test_connect_and_disconnect() {
    let server = TestServer::start().await.expect("Failed to start server");

    let first = server.connect().await.unwrap();
    let second = server.connect().await.unwrap();
    assert_eq!(server.manager().client_count(), 2);

    first.close().await.unwrap();
    server.wait_for_clients(1).await.unwrap();

    drop(second);
    server.wait_for_clients(0).await.unwrap();
}

#[tokio::test]
async fn test_malformed_frame_closes_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ws = server.connect().await.unwrap();

    ws.send_text(fixtures::MALFORMED_FRAME).await.unwrap();
    ws.wait_closed().await.unwrap();

    server.wait_for_clients(0).await.unwrap();
}

#[tokio::test]
async fn test_server_shutdown_closes_clients() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ws = server.connect().await.unwrap();
    let manager = server.manager().clone();

    server.shutdown().await.unwrap();

    ws.wait_closed().await.unwrap();
    assert_eq!(manager.client_count(), 0);
}

// ============================================================================
// Event Routing
// ============================================================================

#[tokio::test]
async fn test_unknown_event_keeps_connection_open() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ws = server.connect().await.unwrap();

    ws.send_text(fixtures::unknown_event()).await.unwrap();
    ws.send_text(fixtures::send_message("hi", "a")).await.unwrap();

    let event = ws.next_event().await.unwrap();
    assert_eq!(event.kind(), "new_message");

    let payload: NewMessageEvent = event.decode().unwrap();
    assert_eq!(payload.inner.message, "hi");
    assert_eq!(payload.inner.from, "a");
    assert_eq!(server.manager().client_count(), 1);
}

#[tokio::test]
async fn test_send_message_reaches_every_client() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = server.connect().await.unwrap();
    let mut bob = server.connect().await.unwrap();

    alice
        .send_text(fixtures::send_message("hello bob", "alice"))
        .await
        .unwrap();

    for ws in [&mut alice, &mut bob] {
        let event = ws.next_event().await.unwrap();
        let payload: NewMessageEvent = event.decode().unwrap();
        assert_eq!(payload.inner.message, "hello bob");
        assert_eq!(payload.inner.from, "alice");
    }
}

#[tokio::test]
async fn test_bad_payload_keeps_connection_open() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ws = server.connect().await.unwrap();

    ws.send_text(r#"{"type":"send_message","payload":"not an object"}"#)
        .await
        .unwrap();
    ws.send_text(fixtures::send_message("still here", "a"))
        .await
        .unwrap();

    let event = ws.next_event().await.unwrap();
    let payload: NewMessageEvent = event.decode().unwrap();
    assert_eq!(payload.inner.message, "still here");
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn test_responsive_client_survives_several_pings() {
    let config = AppConfig {
        heartbeat: HeartbeatConfig::new(Duration::from_millis(1000)),
        ..test_config()
    };
    let server = TestServer::start_with_config(config)
        .await
        .expect("Failed to start server");
    let mut ws = server.connect().await.unwrap();

    // Reading lets the client library answer pings with pongs; keep the gaps
    // between reads well under the 100ms of slack after each ping.
    let started = tokio::time::Instant::now();
    let mut i = 0;
    while started.elapsed() < Duration::from_millis(2500) {
        ws.send_text(fixtures::send_message(&format!("tick {i}"), "a"))
            .await
            .unwrap();
        let event = ws.next_event().await.unwrap();
        assert_eq!(event.kind(), "new_message");
        tokio::time::sleep(Duration::from_millis(20)).await;
        i += 1;
    }

    assert_eq!(server.manager().client_count(), 1);
}

#[tokio::test]
async fn test_silent_client_is_dropped() {
    let config = AppConfig {
        heartbeat: HeartbeatConfig::new(Duration::from_millis(300)),
        ..test_config()
    };
    let server = TestServer::start_with_config(config)
        .await
        .expect("Failed to start server");

    // Connected, but never reads, so pings go unanswered
    let _ws = server.connect().await.unwrap();
    assert_eq!(server.manager().client_count(), 1);

    server.wait_for_clients(0).await.unwrap();
}
