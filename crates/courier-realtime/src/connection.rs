// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam for the realtime client.

use async_trait::async_trait;
use courier_core::CourierError;
use thiserror::Error;

/// Why a connection attempt failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The server refused the credentials during the handshake (401/403).
    #[error("realtime handshake rejected credentials (HTTP {status})")]
    AuthRejected { status: u16 },

    /// Any other failure: DNS, TCP, TLS, unexpected handshake status.
    #[error("realtime connection failed: {0}")]
    Failed(String),
}

/// An open, bidirectional, message-oriented connection.
///
/// `recv` must be cancel-safe: the client polls it inside `tokio::select!`.
#[async_trait]
pub trait RealtimeConnection: Send {
    /// Next inbound text frame. `None` once the connection is closed.
    async fn recv(&mut self) -> Option<Result<String, CourierError>>;

    /// Writes one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), CourierError>;

    /// Sends a keepalive ping.
    async fn ping(&mut self) -> Result<(), CourierError>;

    /// Closes the connection. Errors are irrelevant at this point.
    async fn close(&mut self);
}

/// Opens realtime connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connects to `url`, which already carries the credential query parameter.
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeConnection>, ConnectError>;
}
