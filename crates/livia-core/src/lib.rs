// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the LIVIA inbox service.
//!
//! Provides the domain types (conversations, contacts, messages, tags,
//! ledger entries), the conversation lifecycle rules, the shared error
//! type, and the repository traits implemented by storage backends.

pub mod error;
pub mod lifecycle;
pub mod traits;
pub mod types;

pub use error::LiviaError;
pub use lifecycle::{LifecycleAction, Transition};
pub use traits::{ConversationRepository, StorageAdapter};
pub use types::{
    AuthenticatedUser, Contact, ContactId, Conversation, ConversationDelta, ConversationId,
    ConversationStatus, ConversationWithContact, HealthStatus, LedgerEntry, LedgerKind,
    MergeEffect, Message, MessageId, SenderRole, Tag, TagAssignment, TagAutomation, TagId, TagType,
    TenantId, UserId,
};
