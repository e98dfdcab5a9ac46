// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connectivity monitoring for Courier.
//!
//! The [`ConnectivityMonitor`] holds the current online/offline hint and
//! broadcasts transitions to the queue, realtime client and telemetry
//! logger. The signal is advisory: consumers use it to decide when to
//! attempt work, never as proof that a request will succeed.

pub mod monitor;
pub mod probe;

pub use monitor::{ConnectivityEvents, ConnectivityMonitor, Transition};
pub use probe::ReachabilityProbe;
