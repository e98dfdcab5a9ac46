// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Courier event delivery.

use thiserror::Error;

/// The primary error type used across all Courier adapter traits and services.
///
/// Variants follow the delivery error taxonomy: transient failures are retried
/// by the owning component, rejections are terminal and surfaced to the caller,
/// serialization failures are dropped and logged, and capacity errors degrade
/// gracefully.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transient delivery failure (network unreachable, timeout, 5xx, 429).
    #[error("transient failure: {message}")]
    Transient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Definitive rejection from the backend (validation error, forbidden).
    #[error("rejected by backend (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Payload could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A bounded buffer or queue is full.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// A referenced entity does not exist (unknown order client id).
    #[error("not found: {0}")]
    NotFound(String),

    /// A named lease is held by another process (queue owned by `courier run`).
    #[error("locked: {0}")]
    Locked(String),

    /// Realtime connection errors (not connected, send failure).
    #[error("realtime error: {0}")]
    Realtime(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Returns true if the failure is worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    /// Returns true if the backend definitively refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Shorthand for a transient failure without an underlying source.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }
}
