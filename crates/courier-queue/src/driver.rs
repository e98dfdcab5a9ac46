// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background task that decides when the queue drains.

use std::sync::Arc;

use courier_connectivity::Transition;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::queue::SubmissionQueue;

/// Drains on every online transition, on the safety-net timer and on request.
pub(crate) fn spawn(queue: Arc<SubmissionQueue>) -> JoinHandle<()> {
    let mut transitions = queue.connectivity().subscribe();
    let cancel = queue.cancel.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(queue.drain_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = queue.drain_interval().as_secs(),
            "queue drain driver started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("queue drain driver shutting down");
                    break;
                }
                transition = transitions.next() => match transition {
                    Some(Transition::Online) => {
                        debug!("back online, draining queue");
                        run_drain(&queue).await;
                    }
                    Some(Transition::Offline) => debug!("went offline, drains deferred"),
                    None => {
                        debug!("connectivity monitor gone, stopping driver");
                        break;
                    }
                },
                _ = interval.tick() => run_drain(&queue).await,
                _ = queue.drain_requested.notified() => run_drain(&queue).await,
            }
        }
    })
}

async fn run_drain(queue: &SubmissionQueue) {
    if let Err(e) = queue.drain().await {
        warn!(error = %e, "queue drain failed");
    }
}
