// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag and tag-assignment operations.

use livia_core::{
    ConversationId, LiviaError, Tag, TagAssignment, TagAutomation, TagId, TenantId,
};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_from_sql, ts_from_sql, ts_to_sql};

const TAG_COLUMNS: &str =
    "id, tenant_id, name, color, tag_type, active, is_category, automation, created_at";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    let automation = match row.get::<_, Option<String>>(7)? {
        Some(raw) => serde_json::from_str::<TagAutomation>(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        None => TagAutomation::default(),
    };
    Ok(Tag {
        id: TagId::from(row.get::<_, String>(0)?),
        tenant_id: TenantId::from(row.get::<_, String>(1)?),
        name: row.get(2)?,
        color: row.get(3)?,
        tag_type: enum_from_sql(row, 4)?,
        active: row.get(5)?,
        is_category: row.get(6)?,
        automation,
        created_at: ts_from_sql(row, 8)?,
    })
}

/// Create a tag.
pub async fn create_tag(db: &Database, tag: &Tag) -> Result<(), LiviaError> {
    let automation = if tag.automation == TagAutomation::default() {
        None
    } else {
        Some(serde_json::to_string(&tag.automation).map_err(LiviaError::storage)?)
    };
    let tag = tag.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tags (id, tenant_id, name, color, tag_type, active, is_category, \
                 automation, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    tag.id.as_str(),
                    tag.tenant_id.as_str(),
                    tag.name,
                    tag.color,
                    tag.tag_type.to_string(),
                    tag.active,
                    tag.is_category,
                    automation,
                    ts_to_sql(&tag.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Look a tag up by id regardless of tenant (ownership checks only).
pub async fn find_tag(db: &Database, id: &TagId) -> Result<Option<Tag>, LiviaError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
                params![id.as_str()],
                tag_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All tags of a tenant, by name.
pub async fn list_tags(db: &Database, tenant_id: &TenantId) -> Result<Vec<Tag>, LiviaError> {
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE tenant_id = ?1 ORDER BY name"
            ))?;
            let rows = stmt.query_map(params![tenant_id.as_str()], tag_from_row)?;
            let mut tags = Vec::new();
            for row in rows {
                tags.push(row?);
            }
            Ok(tags)
        })
        .await
        .map_err(map_tr_err)
}

/// Attach a tag. Returns `false` if it was already attached.
pub async fn assign_tag(db: &Database, assignment: &TagAssignment) -> Result<bool, LiviaError> {
    let assignment = assignment.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO conversation_tags (conversation_id, tag_id, tenant_id, applied_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    assignment.conversation_id.as_str(),
                    assignment.tag_id.as_str(),
                    assignment.tenant_id.as_str(),
                    ts_to_sql(&assignment.applied_at),
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Every tag assignment of a tenant, oldest first.
pub async fn list_assignments(
    db: &Database,
    tenant_id: &TenantId,
) -> Result<Vec<TagAssignment>, LiviaError> {
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, tag_id, tenant_id, applied_at FROM conversation_tags
                 WHERE tenant_id = ?1 ORDER BY applied_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![tenant_id.as_str()], |row| {
                Ok(TagAssignment {
                    conversation_id: ConversationId::from(row.get::<_, String>(0)?),
                    tag_id: TagId::from(row.get::<_, String>(1)?),
                    tenant_id: TenantId::from(row.get::<_, String>(2)?),
                    applied_at: ts_from_sql(row, 3)?,
                })
            })?;
            let mut assignments = Vec::new();
            for row in rows {
                assignments.push(row?);
            }
            Ok(assignments)
        })
        .await
        .map_err(map_tr_err)
}
