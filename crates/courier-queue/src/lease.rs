// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer ownership of a persisted queue across processes.
//!
//! Two [`SubmissionQueue`](crate::SubmissionQueue) instances over the same
//! storage key would each drain the same orders. Whoever drains must hold the
//! queue lease first; the lease expires on its own if the holder dies, so a
//! crashed runner never locks the queue for good.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{ClientId, CourierError, KeyValueStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default lease lifetime. Renewal runs at a third of this.
pub const LEASE_TTL: Duration = Duration::from_secs(60);

/// Exclusive claim on the queue stored under one storage key.
pub struct QueueLease {
    store: Arc<dyn KeyValueStore>,
    name: String,
    owner: String,
    ttl: Duration,
}

impl QueueLease {
    /// Creates an unclaimed lease for the queue at `storage_key`.
    ///
    /// `label` names the holder in the lease row (`run`, `retry`) and is
    /// suffixed with a random id so concurrent holders never collide.
    pub fn new(store: Arc<dyn KeyValueStore>, storage_key: &str, label: &str) -> Self {
        Self {
            store,
            name: format!("{storage_key}.owner"),
            owner: format!("{label}:{}", ClientId::generate()),
            ttl: LEASE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Claims the lease, or fails with [`CourierError::Locked`] while another
    /// live holder has it.
    pub async fn acquire(&self) -> Result<(), CourierError> {
        if self
            .store
            .acquire_lease(&self.name, &self.owner, self.ttl)
            .await?
        {
            debug!(lease = %self.name, owner = %self.owner, "queue lease acquired");
            Ok(())
        } else {
            Err(CourierError::Locked(format!(
                "queue `{}` is owned by another courier process",
                self.name
            )))
        }
    }

    pub async fn release(&self) -> Result<(), CourierError> {
        self.store.release_lease(&self.name, &self.owner).await?;
        debug!(lease = %self.name, owner = %self.owner, "queue lease released");
        Ok(())
    }

    /// Keeps the lease alive until `cancel` fires.
    ///
    /// If another holder has taken the lease over, `cancel` is cancelled so
    /// the caller stops draining.
    pub fn spawn_renewal(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.ttl / 3);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(ttl_secs = self.ttl.as_secs(), "queue lease renewal started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.store.acquire_lease(&self.name, &self.owner, self.ttl).await {
                            Ok(true) => {}
                            Ok(false) => {
                                error!(lease = %self.name, "queue lease lost to another process, stopping");
                                cancel.cancel();
                                break;
                            }
                            Err(e) => warn!(error = %e, "queue lease renewal failed, will retry"),
                        }
                    }
                    _ = cancel.cancelled() => {
                        info!("queue lease renewal shutting down");
                        break;
                    }
                }
            }
        })
    }
}
