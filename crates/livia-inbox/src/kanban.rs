// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRM kanban board: conversations grouped by category tag.

use std::collections::HashMap;

use livia_core::{ConversationId, ConversationWithContact, Tag, TagAssignment, TagId};
use serde::Serialize;

/// Key of the column holding conversations without a category tag.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanColumn {
    /// Tag id, or [`UNCATEGORIZED`].
    pub key: String,
    pub title: String,
    pub color: Option<String>,
    pub conversations: Vec<ConversationWithContact>,
}

/// Groups `conversations` into one column per active category tag, in tag
/// name order, followed by the uncategorized column.
///
/// A conversation lands in the column of its earliest-applied active
/// category tag. Column contents keep the order of `conversations`.
pub fn group_by_category(
    conversations: &[ConversationWithContact],
    tags: &[Tag],
    assignments: &[TagAssignment],
) -> Vec<KanbanColumn> {
    let mut categories: Vec<&Tag> = tags.iter().filter(|t| t.active && t.is_category).collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    let category_ids: HashMap<&TagId, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, t)| (&t.id, i))
        .collect();

    let mut placement: HashMap<&ConversationId, (&TagAssignment, usize)> = HashMap::new();
    for assignment in assignments {
        let Some(&column) = category_ids.get(&assignment.tag_id) else {
            continue;
        };
        placement
            .entry(&assignment.conversation_id)
            .and_modify(|current| {
                if assignment.applied_at < current.0.applied_at {
                    *current = (assignment, column);
                }
            })
            .or_insert((assignment, column));
    }

    let mut columns: Vec<KanbanColumn> = categories
        .iter()
        .map(|tag| KanbanColumn {
            key: tag.id.to_string(),
            title: tag.name.clone(),
            color: Some(tag.color.clone()),
            conversations: Vec::new(),
        })
        .collect();
    let mut uncategorized = KanbanColumn {
        key: UNCATEGORIZED.to_string(),
        title: "Sem categoria".to_string(),
        color: None,
        conversations: Vec::new(),
    };

    for conversation in conversations {
        match placement.get(conversation.id()) {
            Some(&(_, column)) => columns[column].conversations.push(conversation.clone()),
            None => uncategorized.conversations.push(conversation.clone()),
        }
    }
    columns.push(uncategorized);
    columns
}
