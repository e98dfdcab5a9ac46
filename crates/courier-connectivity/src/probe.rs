// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic backend reachability probe.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{Backend, HealthStatus};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::monitor::ConnectivityMonitor;

/// Feeds backend health checks into a [`ConnectivityMonitor`].
///
/// A reachable backend (healthy or degraded) counts as online; an unhealthy
/// answer or a transport failure counts as offline.
pub struct ReachabilityProbe {
    backend: Arc<dyn Backend>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
}

impl ReachabilityProbe {
    pub fn new(
        backend: Arc<dyn Backend>,
        monitor: Arc<ConnectivityMonitor>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            monitor,
            interval,
        }
    }

    /// Runs one health check and updates the monitor. Returns the observed state.
    pub async fn probe_once(&self) -> bool {
        let reachable = match self.backend.health_check().await {
            Ok(HealthStatus::Healthy) => true,
            Ok(HealthStatus::Degraded(reason)) => {
                debug!(%reason, "backend degraded but reachable");
                true
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                debug!(%reason, "backend unhealthy");
                false
            }
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        };
        debug!(backend = self.backend.name(), reachable, "reachability probe");
        self.monitor.set_online(reachable);
        reachable
    }

    /// Spawns the probe loop. The first probe runs immediately.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = self.interval.as_secs(), "reachability probe started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.probe_once().await;
                    }
                    _ = cancel.cancelled() => {
                        info!("reachability probe shutting down");
                        break;
                    }
                }
            }
        })
    }
}
