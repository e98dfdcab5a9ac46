// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the submission queue, telemetry logger and
//! realtime client over a [`MockBackend`], a [`MockConnector`] and either an
//! in-memory or a temp SQLite store. The connectivity monitor is driven
//! directly with [`TestHarness::go_online`] / [`TestHarness::go_offline`].

use std::sync::Arc;

use courier_config::model::{
    CourierConfig, QueueConfig, RealtimeConfig, StorageConfig, TelemetryConfig,
};
use courier_connectivity::ConnectivityMonitor;
use courier_core::types::{OrderLineItem, OrderRequest};
use courier_core::{CourierError, KeyValueStore};
use courier_queue::SubmissionQueue;
use courier_realtime::RealtimeClient;
use courier_storage::{MemoryStore, SqliteStore};
use courier_telemetry::BatchLogger;

use crate::mock_backend::MockBackend;
use crate::mock_connector::MockConnector;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    online: bool,
    sqlite: bool,
    store: Option<Arc<dyn KeyValueStore>>,
    config: CourierConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            online: true,
            sqlite: false,
            store: None,
            config: CourierConfig::default(),
        }
    }

    /// Start with the connectivity monitor reporting offline.
    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    /// Persist the queue in a temp SQLite database instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Persist the queue in the given store.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_queue_config(mut self, config: QueueConfig) -> Self {
        self.config.queue = config;
        self
    }

    pub fn with_telemetry_config(mut self, config: TelemetryConfig) -> Self {
        self.config.telemetry = config;
        self
    }

    pub fn with_realtime_config(mut self, config: RealtimeConfig) -> Self {
        self.config.realtime = config;
        self
    }

    /// Build the harness. Queue and logger are initialized but not started.
    pub async fn build(self) -> Result<TestHarness, CourierError> {
        let mut config = self.config;
        let mut sqlite = None;
        let mut temp_dir = None;
        let store: Arc<dyn KeyValueStore> = if let Some(store) = self.store {
            store
        } else if self.sqlite {
            let dir =
                tempfile::TempDir::new().map_err(|e| CourierError::Storage { source: e.into() })?;
            config.storage = StorageConfig {
                database_path: dir.path().join("test.db").to_string_lossy().to_string(),
            };
            let opened = Arc::new(SqliteStore::open(&config.storage).await?);
            sqlite = Some(opened.clone());
            temp_dir = Some(dir);
            opened
        } else {
            Arc::new(MemoryStore::new())
        };
        let session_store = Arc::new(MemoryStore::new());

        let backend = Arc::new(MockBackend::new());
        let connector = Arc::new(MockConnector::new());
        let connectivity = Arc::new(ConnectivityMonitor::new(self.online));

        let queue = SubmissionQueue::new(
            config.queue.clone(),
            store.clone(),
            backend.clone(),
            connectivity.clone(),
        );
        queue.init().await?;

        let telemetry = Arc::new(
            BatchLogger::new(
                config.telemetry.clone(),
                backend.clone(),
                connectivity.clone(),
                session_store.clone(),
            )
            .with_identity(Some("test-client".into()), Some("test-tenant".into())),
        );
        telemetry.init().await?;

        let realtime = RealtimeClient::new(
            config.realtime.clone(),
            connector.clone(),
            connectivity.clone(),
        );

        Ok(TestHarness {
            backend,
            connector,
            connectivity,
            store,
            sqlite,
            session_store,
            queue,
            telemetry,
            realtime,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters.
pub struct TestHarness {
    /// The mock backend receiving orders, batches and error reports.
    pub backend: Arc<MockBackend>,
    /// The mock realtime connector.
    pub connector: Arc<MockConnector>,
    /// Connectivity monitor shared by every component.
    pub connectivity: Arc<ConnectivityMonitor>,
    /// Durable store backing the queue.
    pub store: Arc<dyn KeyValueStore>,
    /// The same store as `store` when built `with_sqlite`.
    pub sqlite: Option<Arc<SqliteStore>>,
    /// Session-scoped store holding the telemetry session id.
    pub session_store: Arc<MemoryStore>,
    pub queue: Arc<SubmissionQueue>,
    pub telemetry: Arc<BatchLogger>,
    pub realtime: Arc<RealtimeClient>,
    pub config: CourierConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Start the queue drain driver and the telemetry flush driver.
    pub fn start(&self) {
        self.queue.start();
        self.telemetry.start();
    }

    /// Dispose every component in shutdown order.
    pub async fn shutdown(&self) {
        self.telemetry.dispose().await;
        self.queue.dispose().await;
        self.realtime.disconnect().await;
    }

    /// A second queue over the same store, as after a process restart.
    pub async fn reopen_queue(&self) -> Result<Arc<SubmissionQueue>, CourierError> {
        let queue = SubmissionQueue::new(
            self.config.queue.clone(),
            self.store.clone(),
            self.backend.clone(),
            self.connectivity.clone(),
        );
        queue.init().await?;
        Ok(queue)
    }

    pub fn go_online(&self) {
        self.connectivity.set_online(true);
    }

    pub fn go_offline(&self) {
        self.connectivity.set_online(false);
    }
}

/// A one-item order for `table_id`.
pub fn order_request(table_id: &str) -> OrderRequest {
    OrderRequest {
        table_id: table_id.to_string(),
        items: vec![OrderLineItem {
            menu_item_id: "flat-white".into(),
            quantity: 1,
            notes: None,
        }],
        notes: None,
    }
}
