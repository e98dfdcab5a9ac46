// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests across the connectivity monitor, submission queue,
//! realtime client and telemetry logger.

use std::sync::Arc;
use std::time::Duration;

use courier_backend::HttpBackend;
use courier_config::model::{BackendConfig, QueueConfig, RealtimeConfig, TelemetryConfig};
use courier_connectivity::ConnectivityMonitor;
use courier_core::{ActivityBatch, OrderStatus};
use courier_queue::SubmissionQueue;
use courier_realtime::ConnectionState;
use courier_storage::MemoryStore;
use courier_telemetry::BatchLogger;
use courier_test_utils::{TestHarness, order_request};
use serde_json::json;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn http_backend(server: &MockServer) -> Arc<HttpBackend> {
    Arc::new(
        HttpBackend::new(&BackendConfig {
            base_url: server.uri(),
            auth_token: Some("pos-token".into()),
            request_timeout_secs: 5,
            ..BackendConfig::default()
        })
        .unwrap(),
    )
}

fn http_queue(backend: Arc<HttpBackend>) -> Arc<SubmissionQueue> {
    SubmissionQueue::new(
        QueueConfig::default(),
        Arc::new(MemoryStore::new()),
        backend,
        Arc::new(ConnectivityMonitor::new(true)),
    )
}

async fn idempotency_keys(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/orders")
        .filter_map(|r| r.headers.get("Idempotency-Key"))
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

// ---- Test 1: a shift that starts offline catches up everywhere ----

#[tokio::test(start_paused = true)]
async fn offline_shift_catches_up_when_connectivity_returns() {
    let harness = TestHarness::builder()
        .offline()
        .with_telemetry_config(TelemetryConfig {
            batch_size: 50,
            batch_interval_ms: 5_000,
            ..TelemetryConfig::default()
        })
        .with_realtime_config(RealtimeConfig {
            ping_interval_secs: 0,
            ..RealtimeConfig::default()
        })
        .build()
        .await
        .unwrap();
    harness.start();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _sub = harness.realtime.subscribe("order_updated", move |payload| {
        let _ = tx.send(payload.clone());
    });
    let remote = harness.connector.push_accept();
    harness
        .realtime
        .connect("ws://pos.local/ws".parse().unwrap())
        .await;

    harness.telemetry.page_view("/floor");
    for table in ["T1", "T2", "T3"] {
        harness.queue.enqueue(order_request(table)).await.unwrap();
        harness.telemetry.form_submit("new-order", Some("OrderPad"));
    }

    // Nothing leaves the device while offline.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(harness.backend.order_attempts().is_empty());
    assert!(harness.backend.batches().is_empty());
    assert_eq!(harness.connector.attempt_count(), 0);
    assert_eq!(harness.telemetry.offline_buffered(), 4);

    harness.go_online();

    assert!(harness.backend.wait_for_orders(3, WAIT).await);
    let tables: Vec<_> = harness
        .backend
        .delivered_orders()
        .iter()
        .map(|o| o.payload.table_id.clone())
        .collect();
    assert_eq!(tables, ["T1", "T2", "T3"]);

    assert!(harness.backend.wait_for_batches(1, WAIT).await);
    let batch = &harness.backend.batches()[0];
    assert_eq!(batch.events.len(), 4);
    assert_eq!(batch.events[0].event_type.to_string(), "page_view");

    let mut state = harness.realtime.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .unwrap()
        .unwrap();
    remote.push_message("order_updated", json!({ "table": "T2", "status": "ready" }));
    assert_eq!(
        rx.recv().await.unwrap(),
        json!({ "table": "T2", "status": "ready" })
    );

    harness.shutdown().await;
}

// ---- Test 2: shutdown hands leftover telemetry to a beacon ----

#[tokio::test]
async fn shutdown_flushes_telemetry_and_stops_drivers() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.start();

    harness.telemetry.click("pay", Some("Checkout"));
    harness.queue.enqueue(order_request("T9")).await.unwrap();
    assert!(harness.backend.wait_for_orders(1, WAIT).await);

    harness.shutdown().await;

    let beacons = harness.backend.beacons();
    assert_eq!(beacons.len(), 1);
    assert_eq!(beacons[0].events[0].element.as_deref(), Some("pay"));
    assert_eq!(harness.realtime.state(), ConnectionState::Disconnected);

    harness.queue.enqueue(order_request("T10")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.backend.order_attempts().len(), 1);
}

// ---- Test 3: HTTP delivery retries with a stable idempotency key ----

#[tokio::test]
async fn http_retry_reuses_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 4711 })))
        .mount(&server)
        .await;

    let queue = http_queue(http_backend(&server));
    queue.init().await.unwrap();
    let order = queue.enqueue(order_request("T4")).await.unwrap();

    let first = queue.drain().await.unwrap();
    assert_eq!(first.failed, 1);
    let waiting = queue.get(&order.client_id).await.unwrap();
    assert_eq!(waiting.status, OrderStatus::Failed);
    assert!(!waiting.rejected);
    assert_eq!(waiting.attempt_count, 1);

    let second = queue.drain().await.unwrap();
    assert_eq!(second.synced, 1);
    let synced = queue.get(&order.client_id).await.unwrap();
    assert_eq!(synced.status, OrderStatus::Synced);
    assert_eq!(synced.server_id.as_deref(), Some("4711"));

    let keys = idempotency_keys(&server).await;
    assert_eq!(keys, [order.client_id.to_string(), order.client_id.to_string()]);

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap();
    assert_eq!(auth.to_str().unwrap(), "Bearer pos-token");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["table_id"], "T4");
}

#[tokio::test]
async fn http_rejection_is_not_retried_automatically() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(422).set_body_string("table closed"))
        .mount(&server)
        .await;

    let queue = http_queue(http_backend(&server));
    queue.init().await.unwrap();
    let order = queue.enqueue(order_request("T5")).await.unwrap();

    assert_eq!(queue.drain().await.unwrap().rejected, 1);
    assert_eq!(queue.drain().await.unwrap().rejected, 0);
    assert_eq!(idempotency_keys(&server).await.len(), 1);

    let failed = queue.get(&order.client_id).await.unwrap();
    assert_eq!(failed.status, OrderStatus::Failed);
    assert!(failed.rejected);
    assert!(failed.last_error.unwrap().contains("422"));

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "order_id": "srv-9" })))
        .mount(&server)
        .await;

    queue.retry(&order.client_id).await.unwrap();
    assert_eq!(queue.drain().await.unwrap().synced, 1);
    assert_eq!(
        queue.get(&order.client_id).await.unwrap().server_id.as_deref(),
        Some("srv-9")
    );
}

// ---- Test 4: telemetry over HTTP, including the unload beacon ----

#[tokio::test]
async fn telemetry_batches_and_beacon_reach_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let backend = http_backend(&server);
    let logger = Arc::new(
        BatchLogger::new(
            TelemetryConfig::default(),
            backend.clone(),
            Arc::new(ConnectivityMonitor::new(true)),
            Arc::new(MemoryStore::new()),
        )
        .with_identity(Some("till-2".into()), None),
    );
    let session = logger.init().await.unwrap();

    logger.page_view("/menu");
    assert_eq!(logger.flush(false).await, 1);

    logger.track("shift_closed", Some(json!({ "cash": 120 })));
    logger.dispose().await;
    backend.wait_for_beacons(WAIT).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let batches: Vec<ActivityBatch> = requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(batches[0].events[0].page.as_deref(), Some("/menu"));
    assert_eq!(batches[1].events[0].event_type.to_string(), "shift_closed");
    assert!(batches.iter().all(|b| b.session_id == session));
    assert!(batches.iter().all(|b| b.client_id.as_deref() == Some("till-2")));
}
