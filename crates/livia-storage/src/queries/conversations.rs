// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations.
//!
//! Status changes are compare-and-set: the update only applies while the row
//! still has the status the lifecycle rule was evaluated against.

use livia_core::{
    Contact, ContactId, Conversation, ConversationId, ConversationStatus, ConversationWithContact,
    LiviaError, TenantId, Transition,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_from_sql, ts_from_sql, ts_to_sql};

const CONVERSATION_COLUMNS: &str = "c.id, c.tenant_id, c.contact_id, c.status, c.ai_active, \
     c.last_activity_at, c.unread_count, c.has_unread, c.created_at";

const SELECT_WITH_CONTACT: &str = "SELECT c.id, c.tenant_id, c.contact_id, c.status, c.ai_active, \
     c.last_activity_at, c.unread_count, c.has_unread, c.created_at, \
     ct.id, ct.tenant_id, ct.name, ct.phone \
     FROM conversations c JOIN contacts ct ON ct.id = c.contact_id";

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: ConversationId::from(row.get::<_, String>(0)?),
        tenant_id: TenantId::from(row.get::<_, String>(1)?),
        contact_id: ContactId::from(row.get::<_, String>(2)?),
        status: enum_from_sql(row, 3)?,
        ai_active: row.get(4)?,
        last_activity_at: ts_from_sql(row, 5)?,
        unread_count: row.get(6)?,
        has_unread: row.get(7)?,
        created_at: ts_from_sql(row, 8)?,
    })
}

fn with_contact_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationWithContact> {
    Ok(ConversationWithContact {
        conversation: conversation_from_row(row)?,
        contact: Contact {
            id: ContactId::from(row.get::<_, String>(9)?),
            tenant_id: TenantId::from(row.get::<_, String>(10)?),
            name: row.get(11)?,
            phone: row.get(12)?,
        },
    })
}

pub(crate) fn insert_in(conn: &Connection, conversation: &Conversation) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO conversations (id, tenant_id, contact_id, status, ai_active, \
         last_activity_at, unread_count, has_unread, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            conversation.id.as_str(),
            conversation.tenant_id.as_str(),
            conversation.contact_id.as_str(),
            conversation.status.to_string(),
            conversation.ai_active,
            ts_to_sql(&conversation.last_activity_at),
            conversation.unread_count,
            conversation.has_unread,
            ts_to_sql(&conversation.created_at),
        ],
    )?;
    Ok(())
}

pub(crate) fn select_in(conn: &Connection, id: &str) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?1"),
        params![id],
        conversation_from_row,
    )
    .optional()
}

/// Most recently active non-closed conversation with a contact.
pub(crate) fn select_active_for_contact(
    conn: &Connection,
    tenant_id: &str,
    contact_id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c \
             WHERE c.tenant_id = ?1 AND c.contact_id = ?2 AND c.status != 'closed' \
             ORDER BY c.last_activity_at DESC LIMIT 1"
        ),
        params![tenant_id, contact_id],
        conversation_from_row,
    )
    .optional()
}

/// Insert a conversation row.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), LiviaError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| insert_in(conn, &conversation))
        .await
        .map_err(map_tr_err)
}

/// Look a conversation up by id regardless of tenant.
///
/// Only for ownership checks: callers compare the returned tenant with the
/// authenticated one before acting.
pub async fn find_conversation(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<Conversation>, LiviaError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| select_in(conn, id.as_str()))
        .await
        .map_err(map_tr_err)
}

/// Get a conversation joined with its contact, scoped to `tenant_id`.
pub async fn get_conversation(
    db: &Database,
    id: &ConversationId,
    tenant_id: &TenantId,
) -> Result<Option<ConversationWithContact>, LiviaError> {
    let id = id.clone();
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_WITH_CONTACT} WHERE c.id = ?1 AND c.tenant_id = ?2"),
                params![id.as_str(), tenant_id.as_str()],
                with_contact_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List a tenant's conversations, most recent activity first.
///
/// Rows with equal activity are ordered newest-inserted first.
pub async fn list_conversations(
    db: &Database,
    tenant_id: &TenantId,
) -> Result<Vec<ConversationWithContact>, LiviaError> {
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_WITH_CONTACT} WHERE c.tenant_id = ?1 \
                 ORDER BY c.last_activity_at DESC, c.rowid DESC"
            ))?;
            let rows = stmt.query_map(params![tenant_id.as_str()], with_contact_from_row)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a validated transition if the row still has `transition.from`.
///
/// Returns `false` when the row changed underneath (or does not exist for
/// this tenant); nothing is written in that case.
pub async fn compare_and_set_status(
    db: &Database,
    id: &ConversationId,
    tenant_id: &TenantId,
    transition: Transition,
) -> Result<bool, LiviaError> {
    let id = id.clone();
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET status = ?1, ai_active = ?2 \
                 WHERE id = ?3 AND tenant_id = ?4 AND status = ?5",
                params![
                    transition.to.to_string(),
                    transition.ai_active,
                    id.as_str(),
                    tenant_id.as_str(),
                    transition.from.to_string(),
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Reset the unread counter and flag. Returns whether anything changed.
pub async fn mark_read(
    db: &Database,
    id: &ConversationId,
    tenant_id: &TenantId,
) -> Result<bool, LiviaError> {
    let id = id.clone();
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET unread_count = 0, has_unread = 0 \
                 WHERE id = ?1 AND tenant_id = ?2 AND (unread_count != 0 OR has_unread != 0)",
                params![id.as_str(), tenant_id.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
