// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the queue, realtime client, and telemetry logger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Locally generated identifier of an optimistic order. Never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a telemetry session, stable for the lifetime of the host process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by backend and store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

// --- Orders ---

/// One line of an order creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub menu_item_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The order creation request as the user submitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub table_id: String,
    pub items: Vec<OrderLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Delivery status of an optimistic order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl OrderStatus {
    /// Status only moves forward: pending -> syncing -> synced | failed.
    /// A failed order may go back to pending for another attempt.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Syncing) | (Syncing, Synced) | (Syncing, Failed) | (Failed, Pending)
                | (Failed, Syncing)
        )
    }
}

/// A locally synthesized stand-in for a server-created order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimisticOrder {
    pub client_id: ClientId,
    pub payload: OrderRequest,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Set when the backend definitively refused the order. Rejected orders
    /// stay `failed` until the user explicitly retries them.
    #[serde(default)]
    pub rejected: bool,
    /// Identifier assigned by the backend once the order is persisted.
    #[serde(default)]
    pub server_id: Option<String>,
}

impl OptimisticOrder {
    /// Creates a pending order for a freshly submitted request.
    pub fn new(payload: OrderRequest) -> Self {
        Self {
            client_id: ClientId::generate(),
            payload,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            last_attempt_at: None,
            attempt_count: 0,
            last_error: None,
            rejected: false,
            server_id: None,
        }
    }

    /// Whether the drain routine should attempt this order.
    pub fn is_deliverable(&self) -> bool {
        match self.status {
            OrderStatus::Pending => true,
            OrderStatus::Failed => !self.rejected,
            OrderStatus::Syncing | OrderStatus::Synced => false,
        }
    }
}

/// Server acknowledgement of a persisted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: Option<String>,
}

// --- Telemetry ---

/// Kind of an activity event.
///
/// Serialized as a plain string (`"page_view"`, `"click"`, ...); unknown
/// strings round-trip through [`ActivityEventType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityEventType {
    PageView,
    Click,
    ApiCall,
    FormSubmit,
    #[strum(default)]
    Custom(String),
}

impl From<String> for ActivityEventType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Self::Custom(value))
    }
}

impl From<ActivityEventType> for String {
    fn from(value: ActivityEventType) -> Self {
        value.to_string()
    }
}

/// One user or system activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub event_type: ActivityEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub session_id: SessionId,
}

impl ActivityEvent {
    /// Creates an event stamped with the current time and no optional fields.
    pub fn new(event_type: ActivityEventType, session_id: SessionId) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            page: None,
            component: None,
            action: None,
            element: None,
            metadata: None,
            session_id,
        }
    }
}

/// An ordered group of activity events transmitted in one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub events: Vec<ActivityEvent>,
    pub sent_at: DateTime<Utc>,
}

/// A single critical event. Never batched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// --- Realtime ---

/// Wire envelope of a realtime message in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, alias = "data")]
    pub payload: serde_json::Value,
}
