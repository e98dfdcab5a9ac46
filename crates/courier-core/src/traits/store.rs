// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store trait for durable and session-scoped persistence.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CourierError;

/// A simple string key-value store.
///
/// Implementations must tolerate missing keys (return `Ok(None)`); callers
/// treat malformed values as empty. There is no transactional primitive, so
/// callers that read-modify-write a value must serialize those sequences
/// themselves. Across processes that is done with a named lease: only the
/// lease holder may write the values the lease guards.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the human-readable name of this store.
    fn name(&self) -> &str;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CourierError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), CourierError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CourierError>;

    /// Claims lease `name` for `owner` until `ttl` from now.
    ///
    /// Returns `true` when the lease was free, expired, or already held by
    /// `owner` (the expiry is then extended). Check and claim happen as one
    /// atomic step.
    async fn acquire_lease(
        &self,
        name: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, CourierError>;

    /// Gives up lease `name` if `owner` holds it.
    async fn release_lease(&self, name: &str, owner: &str) -> Result<(), CourierError>;
}
