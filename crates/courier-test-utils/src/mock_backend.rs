// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock backend for deterministic testing.
//!
//! `MockBackend` implements `Backend` with scripted responses and records
//! every order, batch, error report and beacon it receives.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use courier_core::types::{
    ActivityBatch, ClientId, ErrorEvent, HealthStatus, OptimisticOrder, OrderReceipt,
};
use courier_core::{Backend, CourierError};

/// One scripted answer of the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Accept the request.
    Ok,
    /// Fail with a retryable error.
    Transient(String),
    /// Refuse definitively with the given HTTP status.
    Reject(u16, String),
}

impl MockResponse {
    fn into_result(self) -> Result<(), CourierError> {
        match self {
            Self::Ok => Ok(()),
            Self::Transient(message) => Err(CourierError::transient(message)),
            Self::Reject(status, message) => Err(CourierError::Rejected { status, message }),
        }
    }
}

#[derive(Default)]
struct Recorded {
    order_script: VecDeque<MockResponse>,
    batch_script: VecDeque<MockResponse>,
    error_script: VecDeque<MockResponse>,
    attempts: Vec<ClientId>,
    orders: Vec<OptimisticOrder>,
    batches: Vec<ActivityBatch>,
    errors: Vec<ErrorEvent>,
    beacons: Vec<ActivityBatch>,
    health: Option<HealthStatus>,
}

/// A mock backend.
///
/// Each call pops the next scripted [`MockResponse`] for its kind; with an
/// empty script every call succeeds. Only accepted orders and batches are
/// recorded as delivered; every order submission is recorded as an attempt.
pub struct MockBackend {
    inner: Mutex<Recorded>,
    activity: Notify,
}

impl MockBackend {
    /// Create a healthy mock backend that accepts everything.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Recorded {
                health: Some(HealthStatus::Healthy),
                ..Recorded::default()
            }),
            activity: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue answers for the next order submissions.
    pub fn script_orders(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.lock().order_script.extend(responses);
    }

    /// Queue answers for the next batch sends.
    pub fn script_batches(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.lock().batch_script.extend(responses);
    }

    /// Queue answers for the next error reports.
    pub fn script_errors(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.lock().error_script.extend(responses);
    }

    /// Set the answer of `health_check`. `None` makes it fail transiently.
    pub fn set_health(&self, health: Option<HealthStatus>) {
        self.lock().health = health;
    }

    /// Orders the backend accepted, in arrival order.
    pub fn delivered_orders(&self) -> Vec<OptimisticOrder> {
        self.lock().orders.clone()
    }

    /// Client ids of every submission attempt, accepted or not.
    pub fn order_attempts(&self) -> Vec<ClientId> {
        self.lock().attempts.clone()
    }

    /// Batches accepted through `send_batch`.
    pub fn batches(&self) -> Vec<ActivityBatch> {
        self.lock().batches.clone()
    }

    /// Error reports accepted through `send_error`.
    pub fn errors(&self) -> Vec<ErrorEvent> {
        self.lock().errors.clone()
    }

    /// Batches handed to `send_beacon`.
    pub fn beacons(&self) -> Vec<ActivityBatch> {
        self.lock().beacons.clone()
    }

    /// Wait until at least `n` orders were accepted. Returns false on timeout.
    pub async fn wait_for_orders(&self, n: usize, timeout: Duration) -> bool {
        self.wait_until(|r| r.orders.len() >= n, timeout).await
    }

    /// Wait until at least `n` batches were accepted. Returns false on timeout.
    pub async fn wait_for_batches(&self, n: usize, timeout: Duration) -> bool {
        self.wait_until(|r| r.batches.len() >= n, timeout).await
    }

    /// Wait until at least `n` error reports were accepted. Returns false on timeout.
    pub async fn wait_for_errors(&self, n: usize, timeout: Duration) -> bool {
        self.wait_until(|r| r.errors.len() >= n, timeout).await
    }

    async fn wait_until(&self, done: impl Fn(&Recorded) -> bool, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.activity.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if done(&self.lock()) {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    async fn submit_order(&self, order: &OptimisticOrder) -> Result<OrderReceipt, CourierError> {
        let result = {
            let mut recorded = self.lock();
            recorded.attempts.push(order.client_id.clone());
            let response = recorded.order_script.pop_front().unwrap_or(MockResponse::Ok);
            let result = response.into_result();
            if result.is_ok() {
                recorded.orders.push(order.clone());
            }
            result.map(|()| OrderReceipt {
                order_id: Some(format!("srv-{}", recorded.orders.len())),
            })
        };
        self.activity.notify_waiters();
        result
    }

    async fn send_batch(&self, batch: &ActivityBatch) -> Result<(), CourierError> {
        let result = {
            let mut recorded = self.lock();
            let result = recorded
                .batch_script
                .pop_front()
                .unwrap_or(MockResponse::Ok)
                .into_result();
            if result.is_ok() {
                recorded.batches.push(batch.clone());
            }
            result
        };
        self.activity.notify_waiters();
        result
    }

    async fn send_error(&self, event: &ErrorEvent) -> Result<(), CourierError> {
        let result = {
            let mut recorded = self.lock();
            let result = recorded
                .error_script
                .pop_front()
                .unwrap_or(MockResponse::Ok)
                .into_result();
            if result.is_ok() {
                recorded.errors.push(event.clone());
            }
            result
        };
        self.activity.notify_waiters();
        result
    }

    fn send_beacon(&self, batch: &ActivityBatch) {
        self.lock().beacons.push(batch.clone());
        self.activity.notify_waiters();
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        match &self.lock().health {
            Some(status) => Ok(status.clone()),
            None => Err(CourierError::transient("mock backend unreachable")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::types::{OrderLineItem, OrderRequest};

    fn order() -> OptimisticOrder {
        OptimisticOrder::new(OrderRequest {
            table_id: "T1".into(),
            items: vec![OrderLineItem {
                menu_item_id: "tea".into(),
                quantity: 1,
                notes: None,
            }],
            notes: None,
        })
    }

    #[tokio::test]
    async fn scripted_responses_then_default_ok() {
        let backend = MockBackend::new();
        backend.script_orders([
            MockResponse::Transient("503".into()),
            MockResponse::Reject(422, "bad table".into()),
        ]);

        let first = order();
        assert!(backend.submit_order(&first).await.unwrap_err().is_transient());
        assert!(backend.submit_order(&first).await.unwrap_err().is_rejection());
        let receipt = backend.submit_order(&first).await.unwrap();

        assert_eq!(receipt.order_id.as_deref(), Some("srv-1"));
        assert_eq!(backend.order_attempts().len(), 3);
        assert_eq!(backend.delivered_orders().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_orders_times_out() {
        let backend = MockBackend::new();
        assert!(!backend.wait_for_orders(1, Duration::from_secs(1)).await);
        backend.submit_order(&order()).await.unwrap();
        assert!(backend.wait_for_orders(1, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn health_is_settable() {
        let backend = MockBackend::new();
        assert_eq!(backend.health_check().await.unwrap(), HealthStatus::Healthy);
        backend.set_health(None);
        assert!(backend.health_check().await.is_err());
    }
}
