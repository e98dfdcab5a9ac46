// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Courier event delivery.
//!
//! This crate provides the error taxonomy, domain types, and adapter traits
//! shared by the submission queue, realtime client, and telemetry logger.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use traits::{Backend, KeyValueStore};
pub use types::{
    ActivityBatch, ActivityEvent, ActivityEventType, ClientId, ErrorEvent, HealthStatus,
    OptimisticOrder, OrderLineItem, OrderReceipt, OrderRequest, OrderStatus, RealtimeMessage,
    SessionId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_adapter_traits_are_exported() {
        fn _assert_store<T: KeyValueStore>() {}
        fn _assert_backend<T: Backend>() {}
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }
}
