// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the inbox, the gateway, and storage backends.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod repository;
pub mod storage;

pub use repository::ConversationRepository;
pub use storage::StorageAdapter;
