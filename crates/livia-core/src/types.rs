// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, the realtime layer, the inbox, and the gateway.
//!
//! These structs are the single authoritative row schema. Realtime payloads,
//! SQL rows, and HTTP bodies all decode into them at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LiviaError;
use crate::lifecycle::LifecycleAction;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the id is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of an isolated customer account.
    TenantId
);
id_type!(
    /// Identifier of a support conversation.
    ConversationId
);
id_type!(
    /// Identifier of a WhatsApp contact.
    ContactId
);
id_type!(
    /// Identifier of a message within a conversation.
    MessageId
);
id_type!(
    /// Identifier of a tag.
    TagId
);
id_type!(
    /// Identifier of a platform user (agent or admin).
    UserId
);

/// Lifecycle status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Paused,
    Closed,
}

/// A customer support thread with a single contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub tenant_id: TenantId,
    pub contact_id: ContactId,
    pub status: ConversationStatus,
    /// Whether the AI assistant answers this conversation.
    pub ai_active: bool,
    pub last_activity_at: DateTime<Utc>,
    pub unread_count: u32,
    pub has_unread: bool,
    pub created_at: DateTime<Utc>,
}

/// Column-level delta for a conversation row, as carried by change events.
///
/// Identity columns are always present; every other column is optional and
/// only overwrites the target when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDelta {
    pub id: ConversationId,
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_unread: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// What a delta merge changed on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeEffect {
    /// At least one column differed.
    pub changed: bool,
    /// The last-activity timestamp differed (the list must be re-sorted).
    pub activity_changed: bool,
}

impl ConversationDelta {
    /// A delta carrying only the identity columns.
    pub fn identity(id: ConversationId, tenant_id: TenantId) -> Self {
        Self {
            id,
            tenant_id,
            contact_id: None,
            status: None,
            ai_active: None,
            last_activity_at: None,
            unread_count: None,
            has_unread: None,
            created_at: None,
        }
    }

    /// Full-row delta (every column set), as published for inserts.
    pub fn full(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            tenant_id: conversation.tenant_id.clone(),
            contact_id: Some(conversation.contact_id.clone()),
            status: Some(conversation.status),
            ai_active: Some(conversation.ai_active),
            last_activity_at: Some(conversation.last_activity_at),
            unread_count: Some(conversation.unread_count),
            has_unread: Some(conversation.has_unread),
            created_at: Some(conversation.created_at),
        }
    }

    /// Merges the set columns into `target`. Identity columns are never touched.
    pub fn apply_to(&self, target: &mut Conversation) -> MergeEffect {
        let mut effect = MergeEffect::default();

        if let Some(contact_id) = &self.contact_id
            && *contact_id != target.contact_id
        {
            target.contact_id = contact_id.clone();
            effect.changed = true;
        }
        if let Some(status) = self.status
            && status != target.status
        {
            target.status = status;
            effect.changed = true;
        }
        if let Some(ai_active) = self.ai_active
            && ai_active != target.ai_active
        {
            target.ai_active = ai_active;
            effect.changed = true;
        }
        if let Some(at) = self.last_activity_at
            && at != target.last_activity_at
        {
            target.last_activity_at = at;
            effect.changed = true;
            effect.activity_changed = true;
        }
        if let Some(count) = self.unread_count
            && count != target.unread_count
        {
            target.unread_count = count;
            effect.changed = true;
        }
        if let Some(flag) = self.has_unread
            && flag != target.has_unread
        {
            target.has_unread = flag;
            effect.changed = true;
        }
        if let Some(at) = self.created_at
            && at != target.created_at
        {
            target.created_at = at;
            effect.changed = true;
        }

        effect
    }

    /// Builds a full conversation from the delta.
    ///
    /// Fails when a column without a sensible default (contact, status,
    /// last activity) is missing.
    pub fn into_conversation(self) -> Result<Conversation, LiviaError> {
        let missing = |column: &str| LiviaError::Decode {
            message: format!("conversation {} delta lacks `{column}`", self.id),
        };
        let contact_id = self.contact_id.clone().ok_or_else(|| missing("contact_id"))?;
        let status = self.status.ok_or_else(|| missing("status"))?;
        let last_activity_at = self
            .last_activity_at
            .ok_or_else(|| missing("last_activity_at"))?;

        Ok(Conversation {
            id: self.id,
            tenant_id: self.tenant_id,
            contact_id,
            status,
            ai_active: self.ai_active.unwrap_or(status == ConversationStatus::Open),
            last_activity_at,
            unread_count: self.unread_count.unwrap_or(0),
            has_unread: self.has_unread.unwrap_or(false),
            created_at: self.created_at.unwrap_or(last_activity_at),
        })
    }
}

/// A WhatsApp contact owned by a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: String,
}

/// A conversation joined with its contact, as shown in the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationWithContact {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub contact: Contact,
}

impl ConversationWithContact {
    pub fn id(&self) -> &ConversationId {
        &self.conversation.id
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.conversation.last_activity_at
    }
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SenderRole {
    Contact,
    Agent,
    Ai,
}

/// An append-only message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub tenant_id: TenantId,
    pub conversation_id: ConversationId,
    pub sender: SenderRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Tag classification used by reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TagType {
    Description,
    Success,
    Fail,
}

/// Side-effects run when a tag is applied to a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAutomation {
    /// Lifecycle action to run on the tagged conversation.
    #[serde(default)]
    pub action: Option<LifecycleAction>,
    /// Text relayed to the workflow engine as an automatic reply.
    #[serde(default)]
    pub auto_reply: Option<String>,
}

/// A tenant-defined conversation label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tenant_id: TenantId,
    pub name: String,
    pub color: String,
    pub tag_type: TagType,
    pub active: bool,
    /// Category tags define kanban columns.
    pub is_category: bool,
    #[serde(default)]
    pub automation: TagAutomation,
    pub created_at: DateTime<Utc>,
}

/// A tag attached to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub conversation_id: ConversationId,
    pub tag_id: TagId,
    pub tenant_id: TenantId,
    pub applied_at: DateTime<Utc>,
}

/// Direction of a wallet ledger movement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LedgerKind {
    Credit,
    Debit,
    Adjustment,
}

/// One signed movement in a tenant's wallet, in minor credit units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub tenant_id: TenantId,
    /// Signed amount: credits positive, debits negative.
    pub amount: i64,
    pub kind: LedgerKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A user resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub name: String,
}

/// Health status reported by storage health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}
