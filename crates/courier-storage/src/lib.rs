// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value persistence for Courier.
//!
//! [`SqliteStore`] is the durable store that survives restarts: a WAL-mode
//! SQLite database with a single `kv` table, all access serialized through
//! `tokio-rusqlite`'s background thread. [`MemoryStore`] is the
//! session-scoped store that lives exactly as long as the process.

pub mod database;
pub mod memory;
pub mod sqlite;

pub use database::Database;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
