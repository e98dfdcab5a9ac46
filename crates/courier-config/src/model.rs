// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Courier.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Every section is optional and defaults to the values a point-of-sale
/// client ships with.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Client identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Backend API endpoints and credentials.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Durable key-value store location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Durable submission queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Realtime subscription client settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Telemetry batch logger settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Connectivity monitor settings.
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

/// Client identity and logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Identifier of this client installation, attached to telemetry.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Tenant (restaurant) identifier, attached to telemetry.
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            client_id: None,
            tenant_id: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Backend API configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the REST API (orders, logs, health live under it).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Realtime endpoint. `None` derives `ws(s)://<base_url host>/ws`.
    #[serde(default)]
    pub realtime_url: Option<String>,

    /// Bearer token attached to outgoing requests when present.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout enforced by the HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            realtime_url: None,
            auth_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Durable store configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the key-value table.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "courier.db".to_string())
}

/// Durable submission queue configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Soft cap on stored orders; see the overflow policy in the queue crate.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Safety-net drain period.
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Key under which the order list is persisted.
    #[serde(default = "default_queue_storage_key")]
    pub storage_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            drain_interval_secs: default_drain_interval_secs(),
            storage_key: default_queue_storage_key(),
        }
    }
}

fn default_max_queue_size() -> usize {
    100
}

fn default_drain_interval_secs() -> u64 {
    30
}

fn default_queue_storage_key() -> String {
    "courier.offline_orders".to_string()
}

/// Realtime subscription client configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// Whether the binary opens a realtime connection at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failed attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay before the first reconnect; doubles on every further attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single reconnect delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Keepalive ping period. 0 disables pings.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_ping_interval_secs() -> u64 {
    30
}

/// Telemetry batch logger configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Disabling turns every logger call into a no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Buffered events that trigger an immediate flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum time between flushes.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    /// Hard cap on buffered events; beyond it events are dropped.
    #[serde(default = "default_telemetry_max_queue_size")]
    pub max_queue_size: usize,

    /// Key under which the session id lives in session-scoped storage.
    #[serde(default = "default_session_key")]
    pub session_key: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval_ms(),
            max_queue_size: default_telemetry_max_queue_size(),
            session_key: default_session_key(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_interval_ms() -> u64 {
    5000
}

fn default_telemetry_max_queue_size() -> usize {
    100
}

fn default_session_key() -> String {
    "courier.session_id".to_string()
}

/// Connectivity monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectivityConfig {
    /// Period of the backend reachability probe. 0 disables probing, leaving
    /// the online signal to the host application.
    #[serde(default)]
    pub probe_interval_secs: u64,
}
