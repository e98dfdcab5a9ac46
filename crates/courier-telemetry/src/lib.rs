// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry batch logger for Courier.
//!
//! [`BatchLogger`] buffers activity events in memory and ships them as
//! batches when the buffer reaches the batch size, when the batch interval
//! elapses, when connectivity returns, and on dispose (as a beacon). Error
//! events bypass batching and are reported one request each.

mod driver;
pub mod logger;
pub mod report;

pub use logger::{BatchLogger, TelemetryStats};
