// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier run`: wires every delivery service together and runs until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use courier_backend::HttpBackend;
use courier_config::CourierConfig;
use courier_connectivity::{ConnectivityMonitor, ReachabilityProbe};
use courier_core::{Backend, CourierError, KeyValueStore};
use courier_queue::{QueueLease, SubmissionQueue};
use courier_realtime::{RealtimeClient, Subscription, WsConnector};
use courier_storage::{MemoryStore, SqliteStore};
use courier_telemetry::BatchLogger;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Realtime event types the runner logs on arrival.
const LOGGED_EVENTS: &[&str] = &["order_created", "order_updated", "table_updated", "menu_updated"];

/// Upper bound on waiting for in-flight beacons during shutdown.
const BEACON_GRACE: Duration = Duration::from_secs(2);

/// Runs the queue, realtime client and telemetry logger until SIGINT/SIGTERM.
pub async fn run(config: CourierConfig) -> Result<(), CourierError> {
    info!("starting courier");

    let cancel = install_signal_handler();
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    let lease = Arc::new(QueueLease::new(store.clone(), &config.queue.storage_key, "run"));
    lease.acquire().await?;
    let renewal = lease.clone().spawn_renewal(cancel.clone());
    let session_store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let connectivity = Arc::new(ConnectivityMonitor::new(true));

    let probe = (config.connectivity.probe_interval_secs > 0).then(|| {
        ReachabilityProbe::new(
            backend.clone() as Arc<dyn Backend>,
            connectivity.clone(),
            Duration::from_secs(config.connectivity.probe_interval_secs),
        )
        .spawn(cancel.child_token())
    });

    let queue = SubmissionQueue::new(
        config.queue.clone(),
        store.clone(),
        backend.clone(),
        connectivity.clone(),
    );
    queue.init().await?;
    queue.start();
    let updates = spawn_update_logger(&queue, cancel.child_token());

    let telemetry = Arc::new(
        BatchLogger::new(
            config.telemetry.clone(),
            backend.clone(),
            connectivity.clone(),
            session_store,
        )
        .with_identity(config.agent.client_id.clone(), config.agent.tenant_id.clone()),
    );
    let session_id = telemetry.init().await?;
    telemetry.start();
    info!(session_id = %session_id, "telemetry session started");

    let realtime = RealtimeClient::new(
        config.realtime.clone(),
        Arc::new(WsConnector::new()),
        connectivity.clone(),
    );
    let mut subscriptions: Vec<Subscription> = Vec::new();
    if config.realtime.enabled {
        let endpoint = courier_backend::realtime_url(&config.backend)?;
        realtime.set_token(config.backend.auth_token.clone());
        for &event_type in LOGGED_EVENTS {
            subscriptions.push(realtime.subscribe(event_type, move |payload| {
                info!(event_type, %payload, "realtime event");
            }));
        }
        info!(endpoint = %endpoint, "connecting realtime client");
        realtime.connect(endpoint).await;
    } else {
        info!("realtime client disabled");
    }

    telemetry.track("client_started", None);
    info!(
        pending_orders = queue.pending_count().await,
        "courier ready"
    );

    cancel.cancelled().await;
    info!("shutdown signal received, stopping services");

    telemetry.dispose().await;
    backend.wait_for_beacons(BEACON_GRACE).await;
    queue.dispose().await;
    drop(subscriptions);
    realtime.disconnect().await;

    if let Some(handle) = probe {
        let _ = handle.await;
    }
    let _ = updates.await;
    let _ = renewal.await;
    lease.release().await?;
    store.close().await?;

    info!("courier stopped");
    Ok(())
}

/// Logs every order status change until cancelled.
fn spawn_update_logger(
    queue: &Arc<SubmissionQueue>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = queue.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = rx.recv() => match update {
                    Ok(update) => {
                        let order = update.order;
                        info!(
                            client_id = %order.client_id,
                            status = %order.status,
                            attempts = order.attempt_count,
                            "order status changed"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "order update logger lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = cancel.cancelled() => break,
            }
        }
    })
}

/// Installs handlers for SIGINT and SIGTERM.
///
/// The returned token is cancelled when either signal arrives.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
