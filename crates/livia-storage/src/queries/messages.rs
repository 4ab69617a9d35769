// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.
//!
//! Appending a message and bumping the conversation's activity happen in one
//! transaction, so the inbox never sees a message without the matching
//! conversation update.

use chrono::{DateTime, Utc};
use livia_core::{
    ContactId, Conversation, ConversationId, ConversationStatus, LiviaError, Message, MessageId,
    SenderRole, TenantId,
};
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_from_sql, ts_from_sql, ts_to_sql};
use crate::queries::conversations;

/// Result of recording an inbound message.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub message: Message,
    /// The conversation after the activity bump.
    pub conversation: Conversation,
    /// Whether the conversation was created for this message.
    pub created: bool,
}

fn insert_in(conn: &Connection, message: &Message) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO messages (id, tenant_id, conversation_id, sender, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.id.as_str(),
            message.tenant_id.as_str(),
            message.conversation_id.as_str(),
            message.sender.to_string(),
            message.body,
            ts_to_sql(&message.created_at),
        ],
    )?;
    Ok(())
}

/// Timestamps are fixed-width RFC 3339 UTC text, so `MAX` orders them
/// chronologically and a late-arriving older message never rewinds activity.
fn bump_activity(conn: &Connection, message: &Message) -> rusqlite::Result<()> {
    let unread = message.sender == SenderRole::Contact;
    conn.execute(
        "UPDATE conversations SET last_activity_at = MAX(last_activity_at, ?1),
             unread_count = unread_count + ?2,
             has_unread = CASE WHEN ?3 THEN 1 ELSE has_unread END
         WHERE id = ?4 AND tenant_id = ?5",
        params![
            ts_to_sql(&message.created_at),
            u32::from(unread),
            unread,
            message.conversation_id.as_str(),
            message.tenant_id.as_str(),
        ],
    )?;
    Ok(())
}

/// Append a message to an existing conversation and bump its activity.
///
/// Returns the conversation row after the update.
pub async fn append_message(db: &Database, message: &Message) -> Result<Conversation, LiviaError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            insert_in(&tx, &message)?;
            bump_activity(&tx, &message)?;
            let conversation = conversations::select_in(&tx, message.conversation_id.as_str())?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a message arriving from outside the inbox (the contact or the AI).
///
/// Goes to the contact's most recent non-closed conversation; a new open
/// conversation is created when there is none.
pub async fn record_inbound(
    db: &Database,
    tenant_id: &TenantId,
    contact_id: &ContactId,
    sender: SenderRole,
    body: &str,
    at: DateTime<Utc>,
) -> Result<InboundRecord, LiviaError> {
    let tenant_id = tenant_id.clone();
    let contact_id = contact_id.clone();
    let body = body.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = conversations::select_active_for_contact(
                &tx,
                tenant_id.as_str(),
                contact_id.as_str(),
            )?;
            let (conversation_id, created) = match existing {
                Some(conversation) => (conversation.id, false),
                None => {
                    let conversation = Conversation {
                        id: ConversationId::from(uuid::Uuid::new_v4().to_string()),
                        tenant_id: tenant_id.clone(),
                        contact_id: contact_id.clone(),
                        status: ConversationStatus::Open,
                        ai_active: true,
                        last_activity_at: at,
                        unread_count: 0,
                        has_unread: false,
                        created_at: at,
                    };
                    conversations::insert_in(&tx, &conversation)?;
                    (conversation.id, true)
                }
            };

            let message = Message {
                id: MessageId::from(uuid::Uuid::new_v4().to_string()),
                tenant_id,
                conversation_id,
                sender,
                body,
                created_at: at,
            };
            insert_in(&tx, &message)?;
            bump_activity(&tx, &message)?;
            let conversation = conversations::select_in(&tx, message.conversation_id.as_str())?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(InboundRecord {
                message,
                conversation,
                created,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation, oldest first.
pub async fn list_messages(
    db: &Database,
    conversation_id: &ConversationId,
    tenant_id: &TenantId,
) -> Result<Vec<Message>, LiviaError> {
    let conversation_id = conversation_id.clone();
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, conversation_id, sender, body, created_at
                 FROM messages WHERE conversation_id = ?1 AND tenant_id = ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(
                params![conversation_id.as_str(), tenant_id.as_str()],
                |row| {
                    Ok(Message {
                        id: MessageId::from(row.get::<_, String>(0)?),
                        tenant_id: TenantId::from(row.get::<_, String>(1)?),
                        conversation_id: ConversationId::from(row.get::<_, String>(2)?),
                        sender: enum_from_sql(row, 3)?,
                        body: row.get(4)?,
                        created_at: ts_from_sql(row, 5)?,
                    })
                },
            )?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
