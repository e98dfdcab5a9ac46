// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event-type to callback registry.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::warn;

/// Handler invoked with the payload of every message of its event type.
pub type Callback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

type Handlers = HashMap<String, Vec<(u64, Callback)>>;

/// Callbacks keyed by event type, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    handlers: Mutex<Handlers>,
    next_id: AtomicU64,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Handlers> {
        // A panicking callback never runs under this lock, but recover anyway.
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn insert(&self, event_type: &str, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(event_type.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    fn remove(&self, event_type: &str, id: u64) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(entry, _)| *entry != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event_type);
        }
        removed
    }

    /// Invokes every callback registered for `event_type`. Returns how many ran.
    ///
    /// Callbacks run outside the lock, so they may subscribe or unsubscribe.
    /// A panicking callback is logged and does not stop the others.
    pub(crate) fn dispatch(&self, event_type: &str, payload: &serde_json::Value) -> usize {
        let callbacks: Vec<Callback> = match self.lock().get(event_type) {
            Some(list) => list.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };
        for callback in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                warn!(event_type, "realtime callback panicked");
            }
        }
        callbacks.len()
    }

    pub(crate) fn count(&self, event_type: &str) -> usize {
        self.lock().get(event_type).map_or(0, Vec::len)
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }
}

/// Handle returned by `RealtimeClient::subscribe`.
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove exactly this callback.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    registry: Weak<Registry>,
    event_type: String,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<Registry>, event_type: String, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            event_type,
            id,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Removes this callback. Returns `false` if it was already gone
    /// (for example after a disconnect cleared the registry).
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(&self.event_type, self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event_type", &self.event_type)
            .field("id", &self.id)
            .finish()
    }
}
