// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime subscription client for Courier.
//!
//! [`RealtimeClient`] keeps one long-lived connection to the backend's push
//! endpoint, re-establishes it after drops with capped exponential backoff,
//! and dispatches inbound typed messages to registered callbacks in wire
//! order. The transport sits behind the [`Connector`] trait; [`WsConnector`]
//! is the WebSocket implementation.

pub mod backoff;
pub mod client;
pub mod connection;
pub mod registry;
pub mod ws;

pub use backoff::reconnect_delay;
pub use client::{ConnectionState, RealtimeClient};
pub use connection::{ConnectError, Connector, RealtimeConnection};
pub use registry::{Callback, Subscription};
pub use ws::WsConnector;
