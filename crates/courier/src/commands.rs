// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maintenance subcommands: `queue list`, `queue retry`, `config show`.

use std::sync::Arc;

use courier_backend::HttpBackend;
use courier_config::CourierConfig;
use courier_connectivity::ConnectivityMonitor;
use courier_core::{ClientId, CourierError, KeyValueStore, OptimisticOrder};
use courier_queue::{QueueLease, SubmissionQueue};
use courier_queue::persist::decode_orders;
use courier_storage::SqliteStore;

/// Prints the persisted queue without touching the backend.
pub async fn queue_list(config: &CourierConfig) -> Result<(), CourierError> {
    let store = SqliteStore::open(&config.storage).await?;
    let raw = store.get(&config.queue.storage_key).await?;
    let orders = decode_orders(raw.as_deref());
    store.close().await?;

    if orders.is_empty() {
        println!("queue is empty");
        return Ok(());
    }
    println!("{}", render_header());
    for order in &orders {
        println!("{}", render_row(order));
    }
    Ok(())
}

/// Resets a failed order to pending and runs one drain pass.
///
/// Refuses with [`CourierError::Locked`] while `courier run` owns the queue;
/// the running service already retries deliverable orders on its own.
pub async fn queue_retry(config: &CourierConfig, client_id: &str) -> Result<(), CourierError> {
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    let lease = QueueLease::new(store.clone(), &config.queue.storage_key, "retry");
    if let Err(e) = lease.acquire().await {
        store.close().await?;
        return Err(e);
    }

    let result = retry_once(config, store.clone(), client_id).await;
    lease.release().await?;
    store.close().await?;
    result
}

async fn retry_once(
    config: &CourierConfig,
    store: Arc<SqliteStore>,
    client_id: &str,
) -> Result<(), CourierError> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let queue = SubmissionQueue::new(
        config.queue.clone(),
        store,
        backend,
        Arc::new(ConnectivityMonitor::new(true)),
    );
    queue.init().await?;

    let id = ClientId(client_id.to_string());
    let order = queue.retry(&id).await?;
    println!("{client_id}: {}", order.status);

    let report = queue.drain().await?;
    if let Some(order) = queue.get(&id).await {
        println!("{}", render_row(&order));
    }
    println!(
        "drain: {} synced, {} failed, {} rejected",
        report.synced, report.failed, report.rejected
    );
    Ok(())
}

/// Prints the effective configuration with secrets masked.
pub fn config_show(config: &CourierConfig) -> Result<(), CourierError> {
    let mut shown = config.clone();
    if shown.backend.auth_token.is_some() {
        shown.backend.auth_token = Some("********".into());
    }
    let rendered =
        toml::to_string_pretty(&shown).map_err(|e| CourierError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(())
}

fn render_header() -> String {
    format!(
        "{:<40} {:<8} {:<8} {:>8}  {}",
        "CLIENT ID", "STATUS", "TABLE", "ATTEMPTS", "LAST ERROR"
    )
}

fn render_row(order: &OptimisticOrder) -> String {
    let status = if order.rejected {
        format!("{} (rejected)", order.status)
    } else {
        order.status.to_string()
    };
    format!(
        "{:<40} {:<8} {:<8} {:>8}  {}",
        order.client_id,
        status,
        order.payload.table_id,
        order.attempt_count,
        order.last_error.as_deref().unwrap_or("-")
    )
}
