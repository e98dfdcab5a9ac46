// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a backend server.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted backend that records every delivery
//! - [`MockConnector`] - Scripted realtime connector with controllable connections
//! - [`FlakyStore`] - In-memory store whose writes can be made to fail
//! - [`TestHarness`] - Queue, telemetry and realtime wired over the mocks

pub mod harness;
pub mod mock_backend;
pub mod mock_connector;
pub mod mock_store;

pub use harness::{TestHarness, order_request};
pub use mock_backend::{MockBackend, MockResponse};
pub use mock_connector::{MockConnection, MockConnector, MockRemote};
pub use mock_store::FlakyStore;
