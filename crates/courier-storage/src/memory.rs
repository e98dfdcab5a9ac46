// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-lifetime key-value store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use courier_core::{CourierError, KeyValueStore};

/// In-memory store whose contents vanish with the process.
///
/// Backs session-scoped values such as the telemetry session id, and stands
/// in for the durable store in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    /// Lease name to (owner, expiry).
    leases: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CourierError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CourierError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CourierError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn acquire_lease(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, CourierError> {
        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        if let Some((holder, expires_at)) = leases.get(name)
            && holder != owner
            && *expires_at > now
        {
            return Ok(false);
        }
        leases.insert(name.to_string(), (owner.to_string(), now + ttl));
        Ok(true)
    }

    async fn release_lease(&self, name: &str, owner: &str) -> Result<(), CourierError> {
        let mut leases = self.leases.lock().await;
        if leases.get(name).is_some_and(|(holder, _)| holder == owner) {
            leases.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_set_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.set("courier.session_id", "session_abc").await.unwrap();
        assert_eq!(
            store.get("courier.session_id").await.unwrap().as_deref(),
            Some("session_abc")
        );
        assert_eq!(store.len().await, 1);

        store.remove("courier.session_id").await.unwrap();
        assert_eq!(store.get("courier.session_id").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn lease_expires_after_ttl() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(30);

        assert!(store.acquire_lease("queue", "a", ttl).await.unwrap());
        assert!(!store.acquire_lease("queue", "b", ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.acquire_lease("queue", "b", ttl).await.unwrap());
        assert!(!store.acquire_lease("queue", "a", ttl).await.unwrap());

        store.release_lease("queue", "b").await.unwrap();
        assert!(store.acquire_lease("queue", "a", ttl).await.unwrap());
    }
}
