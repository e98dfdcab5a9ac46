// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Online/offline state with transition notifications.

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Transition buffer per subscriber. A subscriber that falls further behind
/// is resynchronized to the current state.
const TRANSITION_CAPACITY: usize = 32;

/// A change of the connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Online,
    Offline,
}

impl Transition {
    fn from_online(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }

    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Current connectivity state plus a transition feed.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    transitions: broadcast::Sender<Transition>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self { state, transitions }
    }

    /// Current reachability hint.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Feeds the platform signal. A transition fires only on an actual change.
    ///
    /// Returns whether the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
            // No receivers is fine: nobody is listening yet.
            let _ = self.transitions.send(Transition::from_online(online));
        }
        changed
    }

    /// Subscribes to transitions that happen after this call.
    pub fn subscribe(&self) -> ConnectivityEvents {
        ConnectivityEvents {
            transitions: self.transitions.subscribe(),
            state: self.state.subscribe(),
        }
    }

    /// Watch handle on the raw state, for `wait_for`-style consumers.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Stream of connectivity transitions for one consumer.
pub struct ConnectivityEvents {
    transitions: broadcast::Receiver<Transition>,
    state: watch::Receiver<bool>,
}

impl ConnectivityEvents {
    /// Waits for the next transition. Returns `None` once the monitor is dropped.
    pub async fn next(&mut self) -> Option<Transition> {
        match self.transitions.recv().await {
            Ok(transition) => Some(transition),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                let online = *self.state.borrow_and_update();
                warn!(skipped, online, "connectivity subscriber lagged, resynchronizing");
                Some(Transition::from_online(online))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
