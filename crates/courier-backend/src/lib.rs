// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementation of the Courier [`Backend`](courier_core::Backend).
//!
//! [`HttpBackend`] talks to the REST API with reqwest, classifies every
//! failure as transient or definitive, and delivers unload batches through a
//! fire-and-forget beacon task.

pub mod client;
pub mod endpoint;

pub use client::{HttpBackend, classify_status};
pub use endpoint::realtime_url;
