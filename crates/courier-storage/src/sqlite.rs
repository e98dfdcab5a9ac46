// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the KeyValueStore trait.

use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::{CourierError, KeyValueStore};

use crate::database::{Database, map_tr_err};

/// Durable key-value store backed by the `kv` table.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at the configured database path.
    pub async fn open(config: &StorageConfig) -> Result<Self, CourierError> {
        let db = Database::open(&config.database_path).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    /// Wrap an already opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CourierError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CourierError> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove(&self, key: &str) -> Result<(), CourierError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn acquire_lease(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, CourierError> {
        let name = name.to_string();
        let owner = owner.to_string();
        let now = chrono::Utc::now().timestamp_millis();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        let claimed = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO lease (name, owner, expires_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET
                         owner = excluded.owner,
                         expires_at = excluded.expires_at
                     WHERE lease.owner = excluded.owner OR lease.expires_at <= ?4",
                    params![name, owner, expires_at, now],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(claimed == 1)
    }

    async fn release_lease(&self, name: &str, owner: &str) -> Result<(), CourierError> {
        let name = name.to_string();
        let owner = owner.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM lease WHERE name = ?1 AND owner = ?2",
                    params![name, owner],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
