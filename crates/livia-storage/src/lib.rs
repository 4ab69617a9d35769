// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the LIVIA inbox service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, tenant-scoped queries for
//! conversations, messages, contacts and tags, and change-event publishing
//! after each committed write.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::{SqliteStorage, TagApplication};
pub use database::{Database, map_tr_err};
pub use models::{enum_from_sql, now_millis, ts_from_sql, ts_to_sql};
pub use queries::messages::InboundRecord;
