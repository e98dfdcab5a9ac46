// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Buffered activity logger with batch, beacon and error delivery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use courier_config::model::TelemetryConfig;
use courier_connectivity::ConnectivityMonitor;
use courier_core::{
    ActivityBatch, ActivityEvent, ActivityEventType, Backend, CourierError, ErrorEvent,
    KeyValueStore, SessionId,
};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::report;

/// Counters describing what the logger did since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    /// Events accepted into the buffer.
    pub recorded: u64,
    /// Events lost to the buffer cap or a rejected batch.
    pub dropped: u64,
    /// Batches handed to the backend (requests and beacons).
    pub flushed_batches: u64,
    /// Error events the backend accepted.
    pub errors_sent: u64,
}

#[derive(Default)]
struct Counters {
    recorded: AtomicU64,
    dropped: AtomicU64,
    flushed_batches: AtomicU64,
    errors_sent: AtomicU64,
}

#[derive(Default)]
struct Buffers {
    pending: VecDeque<ActivityEvent>,
    offline: VecDeque<ActivityEvent>,
    page: Option<String>,
}

/// Telemetry batch logger.
///
/// `record` and the convenience recorders never block and never touch the
/// network. Delivery happens in [`flush`](Self::flush), driven by the
/// background task started with [`start`](Self::start).
pub struct BatchLogger {
    config: TelemetryConfig,
    client_id: Option<String>,
    tenant_id: Option<String>,
    backend: Arc<dyn Backend>,
    connectivity: Arc<ConnectivityMonitor>,
    session_store: Arc<dyn KeyValueStore>,
    session_id: ArcSwap<SessionId>,
    buffers: Mutex<Buffers>,
    /// Serializes flushes so batches leave in buffer order.
    flush_lock: tokio::sync::Mutex<()>,
    last_flush: Mutex<Instant>,
    pub(crate) flush_requested: Notify,
    pub(crate) cancel: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
    counters: Counters,
}

impl BatchLogger {
    pub fn new(
        config: TelemetryConfig,
        backend: Arc<dyn Backend>,
        connectivity: Arc<ConnectivityMonitor>,
        session_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            client_id: None,
            tenant_id: None,
            backend,
            connectivity,
            session_store,
            session_id: ArcSwap::from_pointee(SessionId::generate()),
            buffers: Mutex::new(Buffers::default()),
            flush_lock: tokio::sync::Mutex::new(()),
            last_flush: Mutex::new(Instant::now()),
            flush_requested: Notify::new(),
            cancel: CancellationToken::new(),
            driver: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// Attaches client and tenant identifiers to every batch and error event.
    pub fn with_identity(mut self, client_id: Option<String>, tenant_id: Option<String>) -> Self {
        self.client_id = client_id;
        self.tenant_id = tenant_id;
        self
    }

    /// Reads the session id from session storage, creating it on first use.
    pub async fn init(&self) -> Result<SessionId, CourierError> {
        let key = &self.config.session_key;
        let session_id = match self.session_store.get(key).await? {
            Some(existing) if !existing.trim().is_empty() => SessionId(existing),
            _ => {
                let fresh = SessionId::generate();
                self.session_store.set(key, &fresh.0).await?;
                fresh
            }
        };
        info!(session_id = %session_id, "telemetry session ready");
        self.session_id.store(Arc::new(session_id.clone()));
        Ok(session_id)
    }

    /// Spawns the flush driver. No-op when telemetry is disabled.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            debug!("telemetry disabled, flush driver not started");
            return;
        }
        let handle = crate::driver::spawn(Arc::clone(self));
        if let Some(previous) = self.lock_driver().replace(handle) {
            previous.abort();
        }
    }

    /// Stops the driver and hands whatever is buffered to a beacon.
    pub async fn dispose(&self) {
        self.cancel.cancel();
        let handle = self.lock_driver().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            error!(error = %e, "telemetry driver terminated abnormally");
        }
        self.flush(true).await;
        debug!("telemetry logger disposed");
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::clone(&self.session_id.load())
    }

    /// Buffers one activity event.
    ///
    /// Events beyond the buffer cap are dropped. Reaching the batch size
    /// wakes the driver for an immediate flush.
    pub fn record(&self, mut event: ActivityEvent) {
        if !self.config.enabled {
            return;
        }
        let buffered = {
            let mut buffers = self.lock_buffers();
            if buffers.pending.len() >= self.config.max_queue_size {
                drop(buffers);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(event_type = %event.event_type, "telemetry buffer full, event dropped");
                return;
            }
            if event.page.is_none() {
                event.page = buffers.page.clone();
            }
            buffers.pending.push_back(event);
            buffers.pending.len()
        };
        self.counters.recorded.fetch_add(1, Ordering::Relaxed);
        if buffered >= self.config.batch_size {
            self.flush_requested.notify_one();
        }
    }

    /// Records a page view and remembers `page` for later events.
    pub fn page_view(&self, page: &str) {
        if !self.config.enabled {
            return;
        }
        self.lock_buffers().page = Some(page.to_string());
        let mut event = self.event(ActivityEventType::PageView);
        event.page = Some(page.to_string());
        self.record(event);
    }

    pub fn click(&self, element: &str, component: Option<&str>) {
        let mut event = self.event(ActivityEventType::Click);
        event.action = Some("click".into());
        event.element = Some(element.to_string());
        event.component = component.map(str::to_string);
        self.record(event);
    }

    /// Records an API call with its outcome and latency.
    pub fn api_call(&self, endpoint: &str, method: &str, status: u16, duration: Duration) {
        let mut event = self.event(ActivityEventType::ApiCall);
        event.action = Some(method.to_string());
        event.metadata = Some(serde_json::json!({
            "endpoint": endpoint,
            "method": method,
            "status": status,
            "duration_ms": duration.as_millis() as u64,
        }));
        self.record(event);
    }

    pub fn form_submit(&self, form: &str, component: Option<&str>) {
        let mut event = self.event(ActivityEventType::FormSubmit);
        event.action = Some("submit".into());
        event.element = Some(form.to_string());
        event.component = component.map(str::to_string);
        self.record(event);
    }

    /// Records an application-defined event type.
    pub fn track(&self, event_type: &str, metadata: Option<serde_json::Value>) {
        let mut event = self.event(ActivityEventType::from(event_type.to_string()));
        event.metadata = metadata;
        self.record(event);
    }

    /// Reports `err` immediately as its own request, never batched.
    ///
    /// Delivery failures are logged and swallowed.
    pub async fn error<E>(&self, err: &E, component: Option<&str>, metadata: Option<serde_json::Value>)
    where
        E: std::error::Error + ?Sized,
    {
        if !self.config.enabled {
            return;
        }
        let event = ErrorEvent {
            error_type: report::error_type_name::<E>(),
            message: err.to_string(),
            stack_trace: report::source_chain(err),
            component: component.map(str::to_string),
            page: self.lock_buffers().page.clone(),
            metadata,
            session_id: self.session_id(),
            client_id: self.client_id.clone(),
            tenant_id: self.tenant_id.clone(),
            timestamp: Utc::now(),
        };
        match self.backend.send_error(&event).await {
            Ok(()) => {
                self.counters.errors_sent.fetch_add(1, Ordering::Relaxed);
                debug!(error_type = %event.error_type, "error event reported");
            }
            Err(e) => warn!(
                error = %e,
                error_type = %event.error_type,
                "failed to report error event"
            ),
        }
    }

    /// Sends everything buffered as one batch. Returns the number of events
    /// handed to the backend.
    ///
    /// Offline, the events move to the offline buffer instead. `sync` uses
    /// the fire-and-forget beacon; otherwise a transient failure moves the
    /// batch to the offline buffer and a rejection drops it.
    pub async fn flush(&self, sync: bool) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let _flushing = self.flush_lock.lock().await;
        self.mark_flushed();

        let online = self.connectivity.is_online();
        let events: Vec<ActivityEvent> = {
            let mut buffers = self.lock_buffers();
            if !online {
                let moved: Vec<_> = buffers.pending.drain(..).collect();
                if !moved.is_empty() {
                    debug!(events = moved.len(), "offline, batch moved to offline buffer");
                    self.stash_offline(&mut buffers, moved);
                }
                return 0;
            }
            let Buffers { pending, offline, .. } = &mut *buffers;
            offline.drain(..).chain(pending.drain(..)).collect()
        };
        if events.is_empty() {
            return 0;
        }

        let count = events.len();
        let batch = ActivityBatch {
            client_id: self.client_id.clone(),
            session_id: self.session_id(),
            tenant_id: self.tenant_id.clone(),
            events,
            sent_at: Utc::now(),
        };

        if sync {
            self.backend.send_beacon(&batch);
            self.counters.flushed_batches.fetch_add(1, Ordering::Relaxed);
            debug!(events = count, "telemetry batch sent as beacon");
            return count;
        }

        match self.backend.send_batch(&batch).await {
            Ok(()) => {
                self.counters.flushed_batches.fetch_add(1, Ordering::Relaxed);
                debug!(events = count, "telemetry batch delivered");
                count
            }
            Err(e) if e.is_rejection() => {
                self.counters
                    .dropped
                    .fetch_add(count as u64, Ordering::Relaxed);
                warn!(error = %e, events = count, "telemetry batch rejected, dropped");
                0
            }
            Err(e) => {
                warn!(error = %e, events = count, "telemetry batch failed, kept for retry");
                let mut buffers = self.lock_buffers();
                self.stash_offline(&mut buffers, batch.events);
                0
            }
        }
    }

    /// Wakes the driver for a flush without waiting for it.
    pub fn request_flush(&self) {
        self.flush_requested.notify_one();
    }

    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            flushed_batches: self.counters.flushed_batches.load(Ordering::Relaxed),
            errors_sent: self.counters.errors_sent.load(Ordering::Relaxed),
        }
    }

    /// Events waiting in the main buffer.
    pub fn buffered(&self) -> usize {
        self.lock_buffers().pending.len()
    }

    /// Events waiting in the offline-retry buffer.
    pub fn offline_buffered(&self) -> usize {
        self.lock_buffers().offline.len()
    }

    pub(crate) fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.config.batch_interval_ms)
    }

    pub(crate) fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// When the interval trigger fires next: one interval after the last flush.
    pub(crate) fn next_deadline(&self) -> Instant {
        *self.last_flush.lock().unwrap_or_else(|e| e.into_inner()) + self.batch_interval()
    }

    fn mark_flushed(&self) {
        *self.last_flush.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// Appends to the offline buffer, dropping its oldest events past the cap.
    fn stash_offline(&self, buffers: &mut Buffers, events: Vec<ActivityEvent>) {
        buffers.offline.extend(events);
        let excess = buffers
            .offline
            .len()
            .saturating_sub(self.config.max_queue_size);
        if excess > 0 {
            buffers.offline.drain(..excess);
            self.counters
                .dropped
                .fetch_add(excess as u64, Ordering::Relaxed);
            warn!(dropped = excess, "offline telemetry buffer full, oldest events dropped");
        }
    }

    fn event(&self, event_type: ActivityEventType) -> ActivityEvent {
        ActivityEvent::new(event_type, self.session_id())
    }

    fn lock_buffers(&self) -> MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.driver.lock().unwrap_or_else(|e| e.into_inner())
    }
}
