// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The submission queue service.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use courier_config::model::QueueConfig;
use courier_connectivity::ConnectivityMonitor;
use courier_core::{
    Backend, ClientId, CourierError, KeyValueStore, OptimisticOrder, OrderRequest, OrderStatus,
};

use crate::persist;

const UPDATE_CAPACITY: usize = 256;

/// Snapshot of an order after a status change.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub order: OptimisticOrder,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries confirmed by the backend.
    pub synced: usize,
    /// Entries that failed transiently and stay queued.
    pub failed: usize,
    /// Entries definitively rejected by the backend.
    pub rejected: usize,
    /// Deliverable entries left untouched because the monitor reported offline.
    pub skipped_offline: usize,
}

/// Durable, FIFO, offline-tolerant queue of order submissions.
///
/// The in-memory list mirrors the durable store. Every mutation rewrites
/// the persisted list while the list lock is held, so read-modify-write is
/// atomic with respect to other queue operations. Synced entries remain in
/// memory as bookkeeping (for [`SubmissionQueue::list`]) until capacity
/// pressure purges them, but are never persisted.
pub struct SubmissionQueue {
    config: QueueConfig,
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn Backend>,
    connectivity: Arc<ConnectivityMonitor>,
    orders: Mutex<Vec<OptimisticOrder>>,
    /// Held for the whole of a drain pass: one pass, one submission in flight.
    drain_lock: Mutex<()>,
    updates: broadcast::Sender<OrderUpdate>,
    pub(crate) drain_requested: Notify,
    pub(crate) cancel: CancellationToken,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SubmissionQueue {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn Backend>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Arc::new(Self {
            config,
            store,
            backend,
            connectivity,
            orders: Mutex::new(Vec::new()),
            drain_lock: Mutex::new(()),
            updates,
            drain_requested: Notify::new(),
            cancel: CancellationToken::new(),
            driver: std::sync::Mutex::new(None),
        })
    }

    /// Loads the persisted queue and repairs entries interrupted by a crash.
    pub async fn init(&self) -> Result<(), CourierError> {
        let raw = self.store.get(&self.config.storage_key).await?;
        let mut loaded = persist::decode_orders(raw.as_deref());
        let repaired = persist::recover(&mut loaded);

        let mut orders = self.orders.lock().await;
        *orders = loaded;
        if repaired {
            self.persist(&orders).await?;
        }
        info!(
            entries = orders.len(),
            key = %self.config.storage_key,
            "submission queue loaded"
        );
        Ok(())
    }

    /// Spawns the drain driver.
    pub fn start(self: &Arc<Self>) {
        let handle = crate::driver::spawn(Arc::clone(self));
        if let Ok(mut driver) = self.driver.lock()
            && let Some(previous) = driver.replace(handle)
        {
            previous.abort();
        }
    }

    /// Stops the drain driver. Entries stay persisted for the next start.
    pub async fn dispose(&self) {
        self.cancel.cancel();
        let handle = self.driver.lock().ok().and_then(|mut d| d.take());
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            error!(error = %e, "queue driver terminated abnormally");
        }
        debug!("submission queue disposed");
    }

    /// Accepts an order and returns its optimistic representation.
    ///
    /// The entry is persisted before this returns. Under normal capacity no
    /// network I/O happens here; the background driver delivers it.
    pub async fn enqueue(&self, request: OrderRequest) -> Result<OptimisticOrder, CourierError> {
        let order = OptimisticOrder::new(request);

        {
            let mut orders = self.orders.lock().await;
            if orders.len() >= self.config.max_queue_size && !purge_oldest_synced(&mut orders) {
                drop(orders);
                return self.enqueue_overflow(order).await;
            }

            orders.push(order.clone());
            if let Err(e) = self.persist(&orders).await {
                orders.retain(|o| o.client_id != order.client_id);
                error!(client_id = %order.client_id, error = %e, "failed to persist order");
                return Err(e);
            }
        }

        info!(client_id = %order.client_id, table_id = %order.payload.table_id, "order queued");
        self.publish(&order);
        self.request_drain();
        Ok(order)
    }

    /// The queue is full and holds no synced bookkeeping to trim.
    ///
    /// Online: one immediate submission. Offline, or if that attempt fails:
    /// the entry goes in past the cap. The order is never dropped.
    async fn enqueue_overflow(
        &self,
        mut order: OptimisticOrder,
    ) -> Result<OptimisticOrder, CourierError> {
        if self.connectivity.is_online() {
            let _drain = self.drain_lock.lock().await;
            order.status = OrderStatus::Syncing;
            order.attempt_count = 1;
            order.last_attempt_at = Some(Utc::now());

            match self.backend.submit_order(&order).await {
                Ok(receipt) => {
                    order.status = OrderStatus::Synced;
                    order.server_id = receipt.order_id;
                    info!(
                        client_id = %order.client_id,
                        "queue full, order delivered directly"
                    );
                    self.publish(&order);
                    return Ok(order);
                }
                Err(e) => {
                    order.status = OrderStatus::Failed;
                    order.rejected = !e.is_transient();
                    order.last_error = Some(e.to_string());
                }
            }
        }

        let mut orders = self.orders.lock().await;
        orders.push(order.clone());
        warn!(
            client_id = %order.client_id,
            size = orders.len(),
            cap = self.config.max_queue_size,
            "queue over capacity, order kept past the cap"
        );
        if let Err(e) = self.persist(&orders).await {
            orders.retain(|o| o.client_id != order.client_id);
            return Err(e);
        }
        drop(orders);

        self.publish(&order);
        Ok(order)
    }

    /// Walks the queue in FIFO order, delivering each deliverable entry.
    ///
    /// A transient failure ends the pass so no later entry overtakes it. A
    /// rejected entry is marked terminal and skipped.
    pub async fn drain(&self) -> Result<DrainReport, CourierError> {
        let _drain = self.drain_lock.lock().await;
        let mut report = DrainReport::default();

        let candidates: Vec<ClientId> = self
            .orders
            .lock()
            .await
            .iter()
            .filter(|o| o.is_deliverable())
            .map(|o| o.client_id.clone())
            .collect();

        if candidates.is_empty() {
            return Ok(report);
        }
        if !self.connectivity.is_online() {
            report.skipped_offline = candidates.len();
            debug!(pending = candidates.len(), "offline, drain deferred");
            return Ok(report);
        }

        debug!(pending = candidates.len(), "drain started");
        for (index, client_id) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() || !self.connectivity.is_online() {
                report.skipped_offline = candidates.len() - index;
                break;
            }

            let Some(order) = self.begin_attempt(client_id).await? else {
                continue;
            };

            match self.backend.submit_order(&order).await {
                Ok(receipt) => {
                    self.finish_attempt(client_id, move |o| {
                        o.status = OrderStatus::Synced;
                        o.server_id = receipt.order_id;
                        o.last_error = None;
                    })
                    .await?;
                    info!(%client_id, attempt = order.attempt_count, "order synced");
                    report.synced += 1;
                }
                Err(e) if e.is_transient() => {
                    let message = e.to_string();
                    self.finish_attempt(client_id, move |o| {
                        o.status = OrderStatus::Failed;
                        o.last_error = Some(message);
                    })
                    .await?;
                    warn!(
                        %client_id,
                        attempt = order.attempt_count,
                        error = %e,
                        "order submission failed, will retry"
                    );
                    report.failed += 1;
                    break;
                }
                Err(e) => {
                    let message = e.to_string();
                    self.finish_attempt(client_id, move |o| {
                        o.status = OrderStatus::Failed;
                        o.rejected = true;
                        o.last_error = Some(message);
                    })
                    .await?;
                    warn!(%client_id, error = %e, "order rejected by backend");
                    report.rejected += 1;
                }
            }
        }

        debug!(?report, "drain finished");
        Ok(report)
    }

    /// Marks an entry `syncing` and returns the snapshot to submit.
    ///
    /// If the marker cannot be persisted the entry is restored, so it stays
    /// deliverable for the next pass.
    async fn begin_attempt(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<OptimisticOrder>, CourierError> {
        let mut orders = self.orders.lock().await;
        let Some(index) = orders.iter().position(|o| &o.client_id == client_id) else {
            return Ok(None);
        };
        if !orders[index].is_deliverable() {
            return Ok(None);
        }

        let previous = orders[index].clone();
        let entry = &mut orders[index];
        debug_assert!(entry.status.can_transition_to(OrderStatus::Syncing));
        entry.status = OrderStatus::Syncing;
        entry.attempt_count += 1;
        entry.last_attempt_at = Some(Utc::now());
        let snapshot = entry.clone();

        if let Err(e) = self.persist(&orders).await {
            orders[index] = previous;
            error!(%client_id, error = %e, "failed to persist attempt, order left deliverable");
            return Err(e);
        }
        drop(orders);
        self.publish(&snapshot);
        Ok(Some(snapshot))
    }

    /// Applies the attempt's outcome and persists it.
    async fn finish_attempt(
        &self,
        client_id: &ClientId,
        apply: impl FnOnce(&mut OptimisticOrder),
    ) -> Result<(), CourierError> {
        let mut orders = self.orders.lock().await;
        let Some(entry) = orders.iter_mut().find(|o| &o.client_id == client_id) else {
            return Ok(());
        };
        apply(entry);
        let snapshot = entry.clone();

        self.persist(&orders).await?;
        drop(orders);
        self.publish(&snapshot);
        Ok(())
    }

    /// Returns a failed entry to `pending` and requests a drain.
    ///
    /// This is the only way a rejected entry is ever submitted again.
    pub async fn retry(&self, client_id: &ClientId) -> Result<OptimisticOrder, CourierError> {
        let mut orders = self.orders.lock().await;
        let entry = orders
            .iter_mut()
            .find(|o| &o.client_id == client_id)
            .ok_or_else(|| CourierError::NotFound(format!("no queued order `{client_id}`")))?;

        if entry.status != OrderStatus::Failed {
            return Ok(entry.clone());
        }
        let previous = entry.clone();
        entry.status = OrderStatus::Pending;
        entry.rejected = false;
        let snapshot = entry.clone();

        if let Err(e) = self.persist(&orders).await {
            if let Some(entry) = orders.iter_mut().find(|o| &o.client_id == client_id) {
                *entry = previous;
            }
            return Err(e);
        }
        drop(orders);

        info!(%client_id, "order scheduled for retry");
        self.publish(&snapshot);
        self.request_drain();
        Ok(snapshot)
    }

    /// Asks the driver to drain as soon as possible.
    pub fn request_drain(&self) {
        self.drain_requested.notify_one();
    }

    /// All entries in submission order, including synced bookkeeping.
    pub async fn list(&self) -> Vec<OptimisticOrder> {
        self.orders.lock().await.clone()
    }

    pub async fn get(&self, client_id: &ClientId) -> Option<OptimisticOrder> {
        self.orders
            .lock()
            .await
            .iter()
            .find(|o| &o.client_id == client_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.lock().await.is_empty()
    }

    /// Entries still awaiting delivery (pending, syncing or retryable failures).
    pub async fn pending_count(&self) -> usize {
        self.orders
            .lock()
            .await
            .iter()
            .filter(|o| o.status == OrderStatus::Syncing || o.is_deliverable())
            .count()
    }

    /// Drops synced bookkeeping from memory.
    pub async fn purge_synced(&self) -> usize {
        let mut orders = self.orders.lock().await;
        let before = orders.len();
        orders.retain(|o| o.status != OrderStatus::Synced);
        before - orders.len()
    }

    /// Receives a snapshot on every status change.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub(crate) fn drain_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.drain_interval_secs)
    }

    async fn persist(&self, orders: &[OptimisticOrder]) -> Result<(), CourierError> {
        let encoded = persist::encode_orders(orders)?;
        self.store.set(&self.config.storage_key, &encoded).await
    }

    fn publish(&self, order: &OptimisticOrder) {
        // No subscribers is fine.
        let _ = self.updates.send(OrderUpdate {
            order: order.clone(),
        });
    }
}

/// Removes the oldest synced entry. Returns whether one was found.
fn purge_oldest_synced(orders: &mut Vec<OptimisticOrder>) -> bool {
    match orders.iter().position(|o| o.status == OrderStatus::Synced) {
        Some(index) => {
            orders.remove(index);
            true
        }
        None => false,
    }
}
