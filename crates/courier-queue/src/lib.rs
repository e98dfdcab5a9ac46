// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable submission queue for Courier.
//!
//! [`SubmissionQueue::enqueue`] hands back an optimistic order immediately and
//! persists it before returning. A background driver drains the queue in
//! FIFO order whenever connectivity returns, on a safety-net timer, and on
//! demand, so orders placed offline reach the backend exactly once each and
//! in the order they were placed.
//!
//! Only one process may drain a persisted queue at a time; see [`QueueLease`].

mod driver;
pub mod lease;
pub mod persist;
pub mod queue;

pub use lease::{LEASE_TTL, QueueLease};
pub use queue::{DrainReport, OrderUpdate, SubmissionQueue};
