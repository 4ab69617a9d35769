// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to conversations for the inbox.

use async_trait::async_trait;

use crate::error::LiviaError;
use crate::types::{ConversationId, ConversationWithContact, TenantId};

/// Tenant-scoped conversation lookups.
///
/// Implementations must filter by `tenant_id` themselves: a conversation
/// owned by another tenant is reported as `None`, never returned.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Fetches one conversation joined with its contact.
    async fn get_conversation(
        &self,
        id: &ConversationId,
        tenant_id: &TenantId,
    ) -> Result<Option<ConversationWithContact>, LiviaError>;

    /// Lists every conversation of the tenant, most recent activity first.
    async fn list_conversations(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ConversationWithContact>, LiviaError>;
}
