// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background task that decides when the logger flushes.

use std::sync::Arc;

use courier_connectivity::Transition;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::logger::BatchLogger;

/// Flushes on the batch-size signal, one interval after the previous flush,
/// and when connectivity returns.
pub(crate) fn spawn(logger: Arc<BatchLogger>) -> JoinHandle<()> {
    let mut transitions = logger.connectivity().subscribe();
    let cancel = logger.cancel.clone();

    tokio::spawn(async move {
        info!(
            interval_ms = logger.batch_interval().as_millis() as u64,
            "telemetry flush driver started"
        );

        loop {
            let deadline = logger.next_deadline();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("telemetry flush driver shutting down");
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    // A flush since the sleep began moved the deadline.
                    if Instant::now() >= logger.next_deadline() {
                        logger.flush(false).await;
                    }
                }
                _ = logger.flush_requested.notified() => {
                    logger.flush(false).await;
                }
                transition = transitions.next() => match transition {
                    Some(Transition::Online) => {
                        debug!("back online, re-sending offline telemetry");
                        logger.flush(false).await;
                    }
                    Some(Transition::Offline) => {}
                    None => break,
                },
            }
        }
    })
}
