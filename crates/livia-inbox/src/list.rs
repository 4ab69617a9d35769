// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable conversation list and its reducer operations.
//!
//! The list is ordered by last activity, most recent first, and holds each
//! conversation id at most once. Every operation returns a list: a new
//! instance when something changed, or a clone sharing the same allocation
//! when nothing did, so [`ConversationList::same_instance`] tells consumers
//! whether to re-render.
//!
//! Among rows with equal activity, the row touched last goes first.

use std::sync::Arc;

use livia_core::{ConversationDelta, ConversationId, ConversationWithContact};

/// Snapshot of a tenant's inbox.
#[derive(Debug, Clone, Default)]
pub struct ConversationList(Arc<Vec<ConversationWithContact>>);

impl ConversationList {
    /// Builds a list from unordered rows. Later duplicates of an id are dropped.
    pub fn new(rows: Vec<ConversationWithContact>) -> Self {
        let mut unique: Vec<ConversationWithContact> = Vec::with_capacity(rows.len());
        for row in rows {
            if !unique.iter().any(|r| r.id() == row.id()) {
                unique.push(row);
            }
        }
        unique.sort_by(|a, b| b.last_activity_at().cmp(&a.last_activity_at()));
        Self(Arc::new(unique))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[ConversationWithContact] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversationWithContact> {
        self.0.iter()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&ConversationWithContact> {
        self.0.iter().find(|row| row.id() == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &ConversationId) -> Option<usize> {
        self.0.iter().position(|row| row.id() == id)
    }

    /// True when both lists share one allocation, i.e. nothing changed
    /// between them.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Inserts a row. A row whose id is already listed is ignored.
    pub fn insert(&self, row: ConversationWithContact) -> Self {
        if self.contains(row.id()) {
            return self.clone();
        }
        let mut rows = Vec::with_capacity(self.0.len() + 1);
        rows.extend(self.0.iter().cloned());
        insert_sorted(&mut rows, row);
        Self(Arc::new(rows))
    }

    /// Merges the columns carried by `delta` into the listed row.
    ///
    /// Returns `None` when the id is not listed, so the caller can fall back
    /// to an insert.
    pub fn merge(&self, delta: &ConversationDelta) -> Option<Self> {
        let index = self.position(&delta.id)?;
        let mut row = self.0[index].clone();
        let effect = delta.apply_to(&mut row.conversation);
        if !effect.changed {
            return Some(self.clone());
        }

        let mut rows: Vec<ConversationWithContact> = self.0.as_ref().clone();
        if effect.activity_changed {
            rows.remove(index);
            insert_sorted(&mut rows, row);
        } else {
            rows[index] = row;
        }
        Some(Self(Arc::new(rows)))
    }

    /// Removes a row. Removing an unlisted id is a no-op.
    pub fn remove(&self, id: &ConversationId) -> Self {
        let Some(index) = self.position(id) else {
            return self.clone();
        };
        let mut rows: Vec<ConversationWithContact> = self.0.as_ref().clone();
        rows.remove(index);
        Self(Arc::new(rows))
    }
}

impl<'a> IntoIterator for &'a ConversationList {
    type Item = &'a ConversationWithContact;
    type IntoIter = std::slice::Iter<'a, ConversationWithContact>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Places `row` ahead of every row with the same or older activity.
fn insert_sorted(rows: &mut Vec<ConversationWithContact>, row: ConversationWithContact) {
    let at = row.last_activity_at();
    let index = rows.partition_point(|existing| existing.last_activity_at() > at);
    rows.insert(index, row);
}
