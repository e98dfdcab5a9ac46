// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Supervised realtime connection with reconnect and typed dispatch.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use courier_config::model::RealtimeConfig;
use courier_connectivity::{ConnectivityMonitor, Transition};
use courier_core::{CourierError, RealtimeMessage};
use reqwest::Url;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::reconnect_delay;
use crate::connection::{ConnectError, Connector, RealtimeConnection};
use crate::registry::{Registry, Subscription};

/// Observable state of the realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// No connection, either idle or waiting for the next attempt.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is open and messages are dispatched.
    Connected,
    /// The reconnect budget is spent; waits for the next online transition.
    GivenUp,
    /// The server refused the credentials; waits for a new token.
    AuthRejected,
}

struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// How a live connection ended.
enum Ended {
    Cancelled,
    Dropped,
}

/// Realtime subscription client.
///
/// One supervisor task per [`connect`](Self::connect) owns the connection,
/// reads inbound messages in wire order and runs the reconnect procedure.
/// Callbacks survive reconnects and are only cleared by
/// [`disconnect`](Self::disconnect).
pub struct RealtimeClient {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    connectivity: Arc<ConnectivityMonitor>,
    registry: Arc<Registry>,
    token: ArcSwapOption<String>,
    state: watch::Sender<ConnectionState>,
    attempts: AtomicU32,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    credentials_changed: Notify,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl RealtimeClient {
    pub fn new(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            config,
            connector,
            connectivity,
            registry: Arc::new(Registry::default()),
            token: ArcSwapOption::empty(),
            state,
            attempts: AtomicU32::new(0),
            outbound: Mutex::new(None),
            credentials_changed: Notify::new(),
            session: tokio::sync::Mutex::new(None),
        })
    }

    /// Starts a fresh connection session to `endpoint`.
    ///
    /// Any previous session is cancelled first. The reconnect counter starts
    /// at zero; registered callbacks are kept.
    pub async fn connect(self: &Arc<Self>, endpoint: Url) {
        let mut session = self.session.lock().await;
        if let Some(old) = session.take() {
            old.cancel.cancel();
            let _ = old.handle.await;
        }
        self.clear_outbound();
        self.attempts.store(0, Ordering::SeqCst);

        info!(endpoint = %endpoint, "realtime client connecting");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).supervise(endpoint, cancel.clone()));
        *session = Some(Session { cancel, handle });
    }

    /// Closes the connection, cancels any pending reconnect and clears every
    /// registered callback.
    pub async fn disconnect(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.cancel.cancel();
            let _ = session.handle.await;
        }
        self.clear_outbound();
        self.registry.clear();
        self.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Disconnected);
        info!("realtime client disconnected");
    }

    /// Registers `callback` for inbound messages of `event_type`.
    ///
    /// Local only: the server is not contacted.
    pub fn subscribe<F>(&self, event_type: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        let id = self.registry.insert(&event_type, Arc::new(callback));
        debug!(event_type = %event_type, id, "realtime subscription added");
        Subscription::new(&self.registry, event_type, id)
    }

    /// Number of callbacks registered for `event_type`.
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.registry.count(event_type)
    }

    /// Writes a typed message on the live connection.
    pub fn send(&self, message_type: &str, payload: serde_json::Value) -> Result<(), CourierError> {
        if self.state() != ConnectionState::Connected {
            return Err(CourierError::Realtime(format!(
                "cannot send `{message_type}`: not connected"
            )));
        }
        let text = serde_json::to_string(&RealtimeMessage {
            message_type: message_type.to_string(),
            payload,
        })?;
        match self.outbound_lock().as_ref() {
            Some(tx) => tx
                .send(text)
                .map_err(|_| CourierError::Realtime("connection closed".into())),
            None => Err(CourierError::Realtime(format!(
                "cannot send `{message_type}`: not connected"
            ))),
        }
    }

    /// Replaces the bearer token used on the next connection attempt.
    ///
    /// A client parked in [`ConnectionState::AuthRejected`] retries at once.
    pub fn set_token(&self, token: Option<String>) {
        self.token.store(token.map(Arc::new));
        if self.state() == ConnectionState::AuthRejected {
            debug!("credentials updated, retrying realtime connection");
            self.credentials_changed.notify_one();
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "realtime state changed");
        }
    }

    fn outbound_lock(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.outbound.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_outbound(&self) {
        self.outbound_lock().take();
    }

    fn url_with_token(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        if let Some(token) = self.token.load_full() {
            url.query_pairs_mut().append_pair("token", &token);
        }
        url
    }

    async fn supervise(self: Arc<Self>, endpoint: Url, cancel: CancellationToken) {
        let mut online = self.connectivity.watch();
        let base = Duration::from_millis(self.config.base_delay_ms);
        let max_delay = Duration::from_millis(self.config.max_delay_ms);

        loop {
            if !*online.borrow_and_update() {
                self.set_state(ConnectionState::Disconnected);
                debug!("offline, realtime connection deferred");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    res = online.wait_for(|up| *up) => {
                        if res.is_err() {
                            break;
                        }
                    }
                }
            }

            self.set_state(ConnectionState::Connecting);
            let url = self.url_with_token(&endpoint);
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.connector.connect(url.as_str()) => result,
            };

            match result {
                Ok(conn) => {
                    self.attempts.store(0, Ordering::SeqCst);
                    self.set_state(ConnectionState::Connected);
                    info!(endpoint = %endpoint, "realtime connected");
                    match self.pump(conn, &cancel).await {
                        Ended::Cancelled => break,
                        Ended::Dropped => {
                            self.set_state(ConnectionState::Disconnected);
                            info!("realtime connection lost");
                        }
                    }
                }
                Err(ConnectError::AuthRejected { status }) => {
                    warn!(status, "realtime credentials rejected, waiting for a new token");
                    self.set_state(ConnectionState::AuthRejected);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.credentials_changed.notified() => continue,
                    }
                }
                Err(ConnectError::Failed(reason)) => {
                    self.set_state(ConnectionState::Disconnected);
                    warn!(
                        reason = %reason,
                        attempt = self.reconnect_attempts(),
                        "realtime connection attempt failed"
                    );
                }
            }

            let attempts = self.attempts.load(Ordering::SeqCst);
            if attempts >= self.config.max_reconnect_attempts {
                warn!(attempts, "realtime reconnect budget exhausted, giving up");
                self.set_state(ConnectionState::GivenUp);
                if !self.wait_for_online_transition(&cancel).await {
                    break;
                }
                info!("back online, resuming realtime reconnects");
                self.attempts.store(0, Ordering::SeqCst);
                continue;
            }

            let attempt = attempts + 1;
            self.attempts.store(attempt, Ordering::SeqCst);
            let delay = reconnect_delay(base, max_delay, attempt);
            info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "scheduling realtime reconnect"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("realtime supervisor stopped");
    }

    /// Returns `false` if cancelled or the monitor went away first.
    async fn wait_for_online_transition(&self, cancel: &CancellationToken) -> bool {
        let mut transitions = self.connectivity.subscribe();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                transition = transitions.next() => match transition {
                    Some(Transition::Online) => return true,
                    Some(Transition::Offline) => {}
                    None => return false,
                },
            }
        }
    }

    async fn pump(&self, mut conn: Box<dyn RealtimeConnection>, cancel: &CancellationToken) -> Ended {
        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.outbound_lock() = Some(tx);
        let mut keepalive = keepalive_interval(self.config.ping_interval_secs);

        let ended = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ended::Cancelled,
                inbound = conn.recv() => match inbound {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(e)) => {
                        warn!(error = %e, "realtime connection error");
                        break Ended::Dropped;
                    }
                    None => break Ended::Dropped,
                },
                Some(text) = rx.recv() => {
                    if let Err(e) = conn.send_text(text).await {
                        warn!(error = %e, "realtime send failed");
                        break Ended::Dropped;
                    }
                }
                _ = next_tick(&mut keepalive) => {
                    if let Err(e) = conn.ping().await {
                        warn!(error = %e, "realtime keepalive failed");
                        break Ended::Dropped;
                    }
                }
            }
        };

        self.clear_outbound();
        conn.close().await;
        ended
    }

    fn dispatch(&self, text: &str) {
        let message: RealtimeMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, len = text.len(), "dropping malformed realtime message");
                return;
            }
        };
        let delivered = self.registry.dispatch(&message.message_type, &message.payload);
        debug!(event_type = %message.message_type, delivered, "realtime message dispatched");
    }
}

fn keepalive_interval(secs: u64) -> Option<Interval> {
    if secs == 0 {
        return None;
    }
    let period = Duration::from_secs(secs);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_is_snake_case() {
        assert_eq!(ConnectionState::GivenUp.to_string(), "given_up");
        assert_eq!(ConnectionState::AuthRejected.to_string(), "auth_rejected");
    }

    struct NeverConnects;

    #[async_trait::async_trait]
    impl Connector for NeverConnects {
        async fn connect(&self, _: &str) -> Result<Box<dyn RealtimeConnection>, ConnectError> {
            Err(ConnectError::Failed("unreachable".into()))
        }
    }

    fn client() -> Arc<RealtimeClient> {
        RealtimeClient::new(
            RealtimeConfig::default(),
            Arc::new(NeverConnects),
            Arc::new(ConnectivityMonitor::new(true)),
        )
    }

    #[test]
    fn token_is_appended_as_query_parameter() {
        let client = client();
        let endpoint = Url::parse("wss://pos.example.com/ws?tenant=42").unwrap();
        assert_eq!(client.url_with_token(&endpoint), endpoint);

        client.set_token(Some("abc def".into()));
        assert_eq!(
            client.url_with_token(&endpoint).as_str(),
            "wss://pos.example.com/ws?tenant=42&token=abc+def"
        );
    }

    #[test]
    fn send_while_disconnected_is_an_error() {
        let client = client();
        let err = client.send("ping", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, CourierError::Realtime(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_clears_callbacks() {
        let client = client();
        let _sub = client.subscribe("order_updated", |_| {});
        assert_eq!(client.subscriber_count("order_updated"), 1);
        client.disconnect().await;
        assert_eq!(client.subscriber_count("order_updated"), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
