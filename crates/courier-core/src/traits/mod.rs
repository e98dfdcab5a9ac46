// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators Courier depends on.
//!
//! All adapters use `#[async_trait]` for dynamic dispatch compatibility so
//! services can hold them as `Arc<dyn Trait>`.

pub mod backend;
pub mod store;

pub use backend::Backend;
pub use store::KeyValueStore;
