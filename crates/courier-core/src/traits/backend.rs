// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend API trait covering every outbound delivery path.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{ActivityBatch, ErrorEvent, HealthStatus, OptimisticOrder, OrderReceipt};

/// The remote service events are delivered to.
///
/// Request/response methods classify their failures: a retryable problem is
/// returned as [`CourierError::Transient`] and a definitive refusal as
/// [`CourierError::Rejected`]. [`Backend::send_beacon`] is the best-effort
/// mode: it never waits for a response and never reports failure.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Returns the human-readable name of this backend.
    fn name(&self) -> &str;

    /// Submits an order creation request. The order's client id is sent as
    /// an idempotency key.
    async fn submit_order(&self, order: &OptimisticOrder) -> Result<OrderReceipt, CourierError>;

    /// Sends a batch of activity events.
    async fn send_batch(&self, batch: &ActivityBatch) -> Result<(), CourierError>;

    /// Sends a single error report.
    async fn send_error(&self, event: &ErrorEvent) -> Result<(), CourierError>;

    /// Fire-and-forget delivery of a batch; returns immediately.
    fn send_beacon(&self, batch: &ActivityBatch);

    /// Checks whether the backend is reachable.
    async fn health_check(&self) -> Result<HealthStatus, CourierError>;
}
