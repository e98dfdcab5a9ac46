// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock realtime transport for deterministic testing.
//!
//! `MockConnector` answers connection attempts from a script. An accepted
//! attempt yields a [`MockConnection`] whose server side is driven through
//! the paired [`MockRemote`]: inject inbound frames, inspect outbound ones,
//! close from the server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

use courier_core::CourierError;
use courier_realtime::{ConnectError, Connector, RealtimeConnection};

enum Scripted {
    Accept(MockConnection),
    Fail(String),
    AuthReject(u16),
}

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<Scripted>,
    urls: Vec<String>,
    attempts: Vec<Instant>,
}

/// A scripted realtime connector.
///
/// Attempts beyond the script fail with a transport error.
#[derive(Default)]
pub struct MockConnector {
    state: Mutex<ConnectorState>,
    activity: Notify,
}

impl MockConnector {
    /// Create a connector with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Accept the next attempt and return the server side of that connection.
    ///
    /// Dropping the returned remote closes the connection from the server.
    pub fn push_accept(&self) -> MockRemote {
        let (conn, remote) = MockConnection::pair();
        self.lock().script.push_back(Scripted::Accept(conn));
        remote
    }

    /// Fail the next attempt with a transport error.
    pub fn push_fail(&self, reason: impl Into<String>) {
        self.lock().script.push_back(Scripted::Fail(reason.into()));
    }

    /// Reject the credentials of the next attempt with `status`.
    pub fn push_auth_reject(&self, status: u16) {
        self.lock().script.push_back(Scripted::AuthReject(status));
    }

    /// URLs of every attempt, in order.
    pub fn urls(&self) -> Vec<String> {
        self.lock().urls.clone()
    }

    /// Instants (tokio clock) of every attempt, in order.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.lock().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.lock().attempts.len()
    }

    /// Wait until at least `n` attempts were made. Returns false on timeout.
    pub async fn wait_for_attempts(&self, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.activity.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.attempt_count() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeConnection>, ConnectError> {
        let next = {
            let mut state = self.lock();
            state.urls.push(url.to_string());
            state.attempts.push(Instant::now());
            state.script.pop_front()
        };
        self.activity.notify_waiters();
        match next {
            Some(Scripted::Accept(conn)) => Ok(Box::new(conn)),
            Some(Scripted::Fail(reason)) => Err(ConnectError::Failed(reason)),
            Some(Scripted::AuthReject(status)) => Err(ConnectError::AuthRejected { status }),
            None => Err(ConnectError::Failed("connection refused".into())),
        }
    }
}

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<String>>,
    pings: AtomicUsize,
    closed_by_client: AtomicBool,
    activity: Notify,
}

/// Client side of a mock connection.
pub struct MockConnection {
    inbound: mpsc::UnboundedReceiver<Result<String, CourierError>>,
    shared: Arc<Shared>,
}

impl MockConnection {
    /// Create a connected (client, server) pair.
    pub fn pair() -> (MockConnection, MockRemote) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        (
            MockConnection {
                inbound: rx,
                shared: Arc::clone(&shared),
            },
            MockRemote {
                inbound: Mutex::new(Some(tx)),
                shared,
            },
        )
    }
}

#[async_trait]
impl RealtimeConnection for MockConnection {
    async fn recv(&mut self) -> Option<Result<String, CourierError>> {
        self.inbound.recv().await
    }

    async fn send_text(&mut self, text: String) -> Result<(), CourierError> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text);
        self.shared.activity.notify_waiters();
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), CourierError> {
        self.shared.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.shared.closed_by_client.store(true, Ordering::SeqCst);
        self.shared.activity.notify_waiters();
    }
}

/// Server side of a mock connection.
pub struct MockRemote {
    inbound: Mutex<Option<mpsc::UnboundedSender<Result<String, CourierError>>>>,
    shared: Arc<Shared>,
}

impl MockRemote {
    fn push(&self, frame: Result<String, CourierError>) {
        if let Some(tx) = self
            .inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            let _ = tx.send(frame);
        }
    }

    /// Deliver a raw text frame to the client.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(text.into()));
    }

    /// Deliver a `{"type": .., "payload": ..}` message to the client.
    pub fn push_message(&self, message_type: &str, payload: serde_json::Value) {
        self.push_text(serde_json::json!({ "type": message_type, "payload": payload }).to_string());
    }

    /// Deliver a transport error to the client.
    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Err(CourierError::Realtime(message.into())));
    }

    /// Close the connection from the server. Already queued frames are still read.
    pub fn close(&self) {
        self.inbound.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Frames the client wrote, in order.
    pub fn sent(&self) -> Vec<String> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn ping_count(&self) -> usize {
        self.shared.pings.load(Ordering::SeqCst)
    }

    /// Whether the client closed its side.
    pub fn is_closed_by_client(&self) -> bool {
        self.shared.closed_by_client.load(Ordering::SeqCst)
    }

    /// Wait until the client wrote at least `n` frames. Returns false on timeout.
    pub async fn wait_for_sent(&self, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.shared.activity.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.sent().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_order_and_default_failure() {
        let connector = MockConnector::new();
        connector.push_auth_reject(401);
        let _remote = connector.push_accept();

        assert!(matches!(
            connector.connect("ws://a").await,
            Err(ConnectError::AuthRejected { status: 401 })
        ));
        assert!(connector.connect("ws://b").await.is_ok());
        assert!(matches!(
            connector.connect("ws://c").await,
            Err(ConnectError::Failed(_))
        ));
        assert_eq!(connector.urls(), vec!["ws://a", "ws://b", "ws://c"]);
    }

    #[tokio::test]
    async fn remote_drives_connection() {
        let (mut conn, remote) = MockConnection::pair();
        remote.push_text("hello");
        remote.close();

        assert_eq!(conn.recv().await.unwrap().unwrap(), "hello");
        assert!(conn.recv().await.is_none());

        conn.send_text("out".into()).await.unwrap();
        conn.close().await;
        assert_eq!(remote.sent(), vec!["out"]);
        assert!(remote.is_closed_by_client());
    }
}
