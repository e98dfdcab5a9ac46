// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON encoding of the persisted order list.

use courier_core::{CourierError, OptimisticOrder, OrderStatus};
use tracing::warn;

/// Decodes a persisted list. Malformed data reads as an empty queue.
pub fn decode_orders(raw: Option<&str>) -> Vec<OptimisticOrder> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(orders) => orders,
        Err(e) => {
            warn!(error = %e, "persisted order queue is malformed, starting empty");
            Vec::new()
        }
    }
}

/// Encodes every entry that still needs the durable store.
///
/// Synced entries are confirmed by the server and are never written.
pub fn encode_orders(orders: &[OptimisticOrder]) -> Result<String, CourierError> {
    let durable: Vec<&OptimisticOrder> = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Synced)
        .collect();
    Ok(serde_json::to_string(&durable)?)
}

/// Repairs a list loaded after a restart.
///
/// An entry persisted mid-attempt goes back to `pending`; synced bookkeeping
/// is dropped. Returns whether anything changed.
pub fn recover(orders: &mut Vec<OptimisticOrder>) -> bool {
    let before = orders.len();
    orders.retain(|o| o.status != OrderStatus::Synced);
    let mut changed = orders.len() != before;

    for order in orders.iter_mut().filter(|o| o.status == OrderStatus::Syncing) {
        order.status = OrderStatus::Pending;
        changed = true;
    }
    changed
}
