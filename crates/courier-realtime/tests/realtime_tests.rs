// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the realtime subscription client.

use std::time::Duration;

use courier_config::model::RealtimeConfig;
use courier_realtime::{ConnectionState, RealtimeClient};
use courier_test_utils::TestHarness;
use reqwest::Url;
use serde_json::json;
use tokio::sync::mpsc;

fn endpoint() -> Url {
    Url::parse("ws://pos.local/ws").unwrap()
}

fn config(max_reconnect_attempts: u32) -> RealtimeConfig {
    RealtimeConfig {
        max_reconnect_attempts,
        base_delay_ms: 1000,
        max_delay_ms: 30_000,
        ping_interval_secs: 0,
        ..RealtimeConfig::default()
    }
}

async fn harness(max_reconnect_attempts: u32) -> TestHarness {
    TestHarness::builder()
        .with_realtime_config(config(max_reconnect_attempts))
        .build()
        .await
        .unwrap()
}

async fn wait_for_state(client: &RealtimeClient, state: ConnectionState) {
    let mut rx = client.watch_state();
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .expect("state channel closed");
}

fn assert_gap(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(10),
        "expected ~{expected:?}, got {actual:?}"
    );
}

// ---- Test 1: one message reaches every callback of its type ----

#[tokio::test(start_paused = true)]
async fn callbacks_fire_once_each_until_unsubscribed() {
    let harness = harness(5).await;
    let client = &harness.realtime;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let first_tx = tx.clone();
    let first = client.subscribe("order_updated", move |payload| {
        let _ = first_tx.send(("first", payload.clone()));
    });
    let second_tx = tx.clone();
    let _second = client.subscribe("order_updated", move |payload| {
        let _ = second_tx.send(("second", payload.clone()));
    });
    let other_tx = tx;
    let _other = client.subscribe("table_updated", move |payload| {
        let _ = other_tx.send(("other", payload.clone()));
    });

    let remote = harness.connector.push_accept();
    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;

    remote.push_message("order_updated", json!({ "id": 7, "status": "ready" }));
    let payload = json!({ "id": 7, "status": "ready" });
    assert_eq!(rx.recv().await.unwrap(), ("first", payload.clone()));
    assert_eq!(rx.recv().await.unwrap(), ("second", payload));

    assert!(first.unsubscribe());
    remote.push_message("order_updated", json!({ "id": 8 }));
    assert_eq!(rx.recv().await.unwrap(), ("second", json!({ "id": 8 })));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(client.subscriber_count("order_updated"), 1);

    harness.shutdown().await;
}

// ---- Test 2: malformed frames are dropped without side effects ----

#[tokio::test(start_paused = true)]
async fn malformed_messages_do_not_break_dispatch() {
    let harness = harness(5).await;
    let client = &harness.realtime;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = client.subscribe("order_updated", move |payload| {
        let _ = tx.send(payload.clone());
    });

    let remote = harness.connector.push_accept();
    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;

    remote.push_text("{not json");
    remote.push_text(r#"{"payload": {"id": 1}}"#);
    remote.push_text(r#"{"type": "order_updated", "data": {"id": 2}}"#);
    remote.push_message("order_updated", json!({ "id": 3 }));

    assert_eq!(rx.recv().await.unwrap(), json!({ "id": 2 }));
    assert_eq!(rx.recv().await.unwrap(), json!({ "id": 3 }));
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(harness.connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn panicking_callback_leaves_connection_up() {
    let harness = harness(5).await;
    let client = &harness.realtime;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _bad = client.subscribe("order_updated", |_| panic!("callback bug"));
    let _good = client.subscribe("order_updated", move |payload| {
        let _ = tx.send(payload.clone());
    });

    let remote = harness.connector.push_accept();
    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;

    remote.push_message("order_updated", json!(1));
    remote.push_message("order_updated", json!(2));

    assert_eq!(rx.recv().await.unwrap(), json!(1));
    assert_eq!(rx.recv().await.unwrap(), json!(2));
    assert_eq!(client.state(), ConnectionState::Connected);
}

// ---- Test 3: reconnect delays double and the budget is finite ----

#[tokio::test(start_paused = true)]
async fn backoff_doubles_then_gives_up_until_back_online() {
    let harness = harness(3).await;
    let client = &harness.realtime;

    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::GivenUp).await;

    let times = harness.connector.attempt_times();
    assert_eq!(times.len(), 4, "initial attempt plus three reconnects");
    assert_gap(times[1] - times[0], Duration::from_secs(1));
    assert_gap(times[2] - times[1], Duration::from_secs(2));
    assert_gap(times[3] - times[2], Duration::from_secs(4));
    assert_eq!(client.reconnect_attempts(), 3);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.connector.attempt_count(), 4);

    let _remote = harness.connector.push_accept();
    harness.go_offline();
    harness.go_online();
    wait_for_state(client, ConnectionState::Connected).await;

    assert_eq!(harness.connector.attempt_count(), 5);
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_reconnects_and_keeps_callbacks() {
    let harness = harness(5).await;
    let client = &harness.realtime;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = client.subscribe("table_updated", move |payload| {
        let _ = tx.send(payload.clone());
    });

    let first = harness.connector.push_accept();
    let second = harness.connector.push_accept();
    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;

    first.close();
    wait_for_state(client, ConnectionState::Disconnected).await;
    assert_eq!(client.reconnect_attempts(), 1);
    wait_for_state(client, ConnectionState::Connected).await;
    assert_eq!(client.reconnect_attempts(), 0);
    assert!(first.is_closed_by_client());

    let times = harness.connector.attempt_times();
    assert_gap(times[1] - times[0], Duration::from_secs(1));

    second.push_message("table_updated", json!({ "table": "T4" }));
    assert_eq!(rx.recv().await.unwrap(), json!({ "table": "T4" }));
}

#[tokio::test(start_paused = true)]
async fn transport_error_triggers_reconnect() {
    let harness = harness(5).await;
    let client = &harness.realtime;

    let first = harness.connector.push_accept();
    let _second = harness.connector.push_accept();
    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;

    first.push_error("connection reset by peer");
    assert!(harness
        .connector
        .wait_for_attempts(2, Duration::from_secs(30))
        .await);
    wait_for_state(client, ConnectionState::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn reconnects_wait_while_offline() {
    let harness = TestHarness::builder()
        .offline()
        .with_realtime_config(config(2))
        .build()
        .await
        .unwrap();
    let client = &harness.realtime;

    client.connect(endpoint()).await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.connector.attempt_count(), 0);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let _remote = harness.connector.push_accept();
    harness.go_online();
    wait_for_state(client, ConnectionState::Connected).await;
    assert_eq!(harness.connector.attempt_count(), 1);
}

// ---- Test 4: auth rejection parks without burning the budget ----

#[tokio::test(start_paused = true)]
async fn auth_rejection_waits_for_new_token() {
    let harness = harness(2).await;
    let client = &harness.realtime;
    client.set_token(Some("expired".into()));
    harness.connector.push_auth_reject(401);

    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::AuthRejected).await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.connector.attempt_count(), 1);
    assert_eq!(client.reconnect_attempts(), 0);
    assert_eq!(client.state(), ConnectionState::AuthRejected);

    let _remote = harness.connector.push_accept();
    client.set_token(Some("fresh".into()));
    wait_for_state(client, ConnectionState::Connected).await;

    let urls = harness.connector.urls();
    assert_eq!(urls[0], "ws://pos.local/ws?token=expired");
    assert_eq!(urls[1], "ws://pos.local/ws?token=fresh");
}

// ---- Test 5: disconnect is final ----

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let harness = harness(5).await;
    let client = &harness.realtime;
    let _sub = client.subscribe("order_updated", |_| {});

    client.connect(endpoint()).await;
    assert!(harness
        .connector
        .wait_for_attempts(1, Duration::from_secs(1))
        .await);

    client.disconnect().await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(harness.connector.attempt_count(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.subscriber_count("order_updated"), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_live_connection() {
    let harness = harness(5).await;
    let client = &harness.realtime;
    let remote = harness.connector.push_accept();

    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;
    client.disconnect().await;

    assert!(remote.is_closed_by_client());
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

// ---- Test 6: outbound messages and keepalive ----

#[tokio::test(start_paused = true)]
async fn send_requires_live_connection() {
    let harness = harness(5).await;
    let client = &harness.realtime;

    assert!(client.send("ack", json!({})).is_err());

    let remote = harness.connector.push_accept();
    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;

    client.send("ack", json!({ "order": 7 })).unwrap();
    assert!(remote.wait_for_sent(1, Duration::from_secs(1)).await);
    let sent: serde_json::Value = serde_json::from_str(&remote.sent()[0]).unwrap();
    assert_eq!(sent, json!({ "type": "ack", "payload": { "order": 7 } }));
}

#[tokio::test(start_paused = true)]
async fn keepalive_pings_on_interval() {
    let harness = TestHarness::builder()
        .with_realtime_config(RealtimeConfig {
            ping_interval_secs: 10,
            ..config(5)
        })
        .build()
        .await
        .unwrap();
    let client = &harness.realtime;
    let remote = harness.connector.push_accept();

    client.connect(endpoint()).await;
    wait_for_state(client, ConnectionState::Connected).await;
    tokio::time::sleep(Duration::from_secs(35)).await;

    assert_eq!(remote.ping_count(), 3);
}
