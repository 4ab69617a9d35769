// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change handlers for the `conversations` table.
//!
//! A handler receives the current list and one change payload and returns
//! the next list. Handlers never fail: undecodable payloads, rows of other
//! tenants and failed contact lookups are dropped with a log and the input
//! list is returned unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use livia_core::{ConversationDelta, ConversationId, ConversationRepository, TenantId};
use livia_realtime::{ChangePayload, EventType, Table};
use tracing::{debug, warn};

use crate::list::ConversationList;

/// What a handler needs besides the payload.
#[derive(Clone)]
pub struct HandlerContext {
    pub tenant_id: TenantId,
    pub repository: Arc<dyn ConversationRepository>,
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

/// Reacts to one kind of change event on one table.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    fn table(&self) -> Table;

    fn event_type(&self) -> EventType;

    /// Computes the next list. Returns `list.clone()` when nothing changed.
    async fn handle(
        &self,
        list: &ConversationList,
        payload: &ChangePayload,
        ctx: &HandlerContext,
    ) -> ConversationList;
}

/// The handlers the inbox registers by default.
pub fn default_handlers() -> Vec<Arc<dyn ChangeHandler>> {
    vec![
        Arc::new(InsertHandler),
        Arc::new(UpdateHandler),
        Arc::new(DeleteHandler),
    ]
}

fn decode_delta(
    payload: &ChangePayload,
    ctx: &HandlerContext,
) -> Option<ConversationDelta> {
    let delta = match payload.decode_new::<ConversationDelta>() {
        Ok(delta) => delta,
        Err(e) => {
            warn!(error = %e, event = %payload.event_type, "dropping undecodable conversation event");
            return None;
        }
    };
    if delta.tenant_id != ctx.tenant_id {
        debug!(
            conversation_id = %delta.id,
            event_tenant = %delta.tenant_id,
            "dropping conversation event of another tenant"
        );
        return None;
    }
    Some(delta)
}

/// Fetches the joined row for an unlisted conversation and inserts it with
/// the payload's columns merged over the fetched ones.
async fn fetch_and_insert(
    list: &ConversationList,
    delta: &ConversationDelta,
    ctx: &HandlerContext,
) -> ConversationList {
    match ctx.repository.get_conversation(&delta.id, &ctx.tenant_id).await {
        Ok(Some(mut row)) => {
            delta.apply_to(&mut row.conversation);
            list.insert(row)
        }
        Ok(None) => {
            warn!(conversation_id = %delta.id, "conversation not visible to tenant, dropping event");
            list.clone()
        }
        Err(e) => {
            warn!(conversation_id = %delta.id, error = %e, "contact lookup failed, dropping event");
            list.clone()
        }
    }
}

/// `INSERT` on `conversations`.
#[derive(Debug, Default)]
pub struct InsertHandler;

#[async_trait]
impl ChangeHandler for InsertHandler {
    fn table(&self) -> Table {
        Table::Conversations
    }

    fn event_type(&self) -> EventType {
        EventType::Insert
    }

    async fn handle(
        &self,
        list: &ConversationList,
        payload: &ChangePayload,
        ctx: &HandlerContext,
    ) -> ConversationList {
        let Some(delta) = decode_delta(payload, ctx) else {
            return list.clone();
        };
        if list.contains(&delta.id) {
            return list.clone();
        }
        fetch_and_insert(list, &delta, ctx).await
    }
}

/// `UPDATE` on `conversations`: column-level merge, or an insert when the
/// row is not listed yet.
#[derive(Debug, Default)]
pub struct UpdateHandler;

#[async_trait]
impl ChangeHandler for UpdateHandler {
    fn table(&self) -> Table {
        Table::Conversations
    }

    fn event_type(&self) -> EventType {
        EventType::Update
    }

    async fn handle(
        &self,
        list: &ConversationList,
        payload: &ChangePayload,
        ctx: &HandlerContext,
    ) -> ConversationList {
        let Some(delta) = decode_delta(payload, ctx) else {
            return list.clone();
        };
        match list.merge(&delta) {
            Some(next) => next,
            None => fetch_and_insert(list, &delta, ctx).await,
        }
    }
}

/// `DELETE` on `conversations`. Idempotent.
#[derive(Debug, Default)]
pub struct DeleteHandler;

#[async_trait]
impl ChangeHandler for DeleteHandler {
    fn table(&self) -> Table {
        Table::Conversations
    }

    fn event_type(&self) -> EventType {
        EventType::Delete
    }

    async fn handle(
        &self,
        list: &ConversationList,
        payload: &ChangePayload,
        ctx: &HandlerContext,
    ) -> ConversationList {
        if let Some(tenant) = payload.tenant_id()
            && tenant != ctx.tenant_id.as_str()
        {
            debug!(event_tenant = tenant, "dropping delete of another tenant");
            return list.clone();
        }
        match payload.record_id() {
            Some(id) => list.remove(&ConversationId::from(id)),
            None => {
                warn!("delete event without an id, dropping");
                list.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeRepository, conversation, row};
    use livia_core::{ConversationStatus, LiviaError};

    fn ctx(repository: FakeRepository) -> HandlerContext {
        HandlerContext {
            tenant_id: TenantId::from("t1"),
            repository: Arc::new(repository),
        }
    }

    #[tokio::test]
    async fn insert_fetches_contact_for_unlisted_row() {
        let repo = FakeRepository::with_rows(vec![row("c1", "t1", 10)]);
        let ctx = ctx(repo.clone());
        let payload =
            ChangePayload::insert(Table::Conversations, &conversation("c1", "t1", 10)).unwrap();

        let next = InsertHandler
            .handle(&ConversationList::empty(), &payload, &ctx)
            .await;
        assert_eq!(next.len(), 1);
        assert_eq!(next.as_slice()[0].contact.name, "Contato c1");
        assert_eq!(repo.fetches(), 1);
    }

    #[tokio::test]
    async fn insert_of_listed_row_skips_fetch() {
        let repo = FakeRepository::with_rows(vec![row("c1", "t1", 10)]);
        let ctx = ctx(repo.clone());
        let list = ConversationList::new(vec![row("c1", "t1", 10)]);
        let payload =
            ChangePayload::insert(Table::Conversations, &conversation("c1", "t1", 10)).unwrap();

        let next = InsertHandler.handle(&list, &payload, &ctx).await;
        assert!(next.same_instance(&list));
        assert_eq!(repo.fetches(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_drops_event() {
        let repo = FakeRepository::failing(LiviaError::storage(std::io::Error::other("down")));
        let ctx = ctx(repo);
        let list = ConversationList::empty();
        let payload =
            ChangePayload::insert(Table::Conversations, &conversation("c1", "t1", 10)).unwrap();

        let next = InsertHandler.handle(&list, &payload, &ctx).await;
        assert!(next.same_instance(&list));
    }

    #[tokio::test]
    async fn missing_row_drops_event() {
        let ctx = ctx(FakeRepository::default());
        let list = ConversationList::empty();
        let payload =
            ChangePayload::insert(Table::Conversations, &conversation("c1", "t1", 10)).unwrap();
        assert!(InsertHandler.handle(&list, &payload, &ctx).await.same_instance(&list));
    }

    #[tokio::test]
    async fn foreign_tenant_events_are_ignored() {
        let repo = FakeRepository::with_rows(vec![row("c9", "t2", 10)]);
        let ctx = ctx(repo.clone());
        let list = ConversationList::empty();
        let payload =
            ChangePayload::insert(Table::Conversations, &conversation("c9", "t2", 10)).unwrap();

        assert!(InsertHandler.handle(&list, &payload, &ctx).await.same_instance(&list));
        assert_eq!(repo.fetches(), 0);
    }

    #[tokio::test]
    async fn update_of_unlisted_row_behaves_as_insert() {
        let repo = FakeRepository::with_rows(vec![row("c1", "t1", 10)]);
        let ctx = ctx(repo);
        let mut delta = ConversationDelta::identity("c1".into(), "t1".into());
        delta.status = Some(ConversationStatus::Paused);
        let identity = ConversationDelta::identity("c1".into(), "t1".into());
        let payload = ChangePayload::update(Table::Conversations, &delta, &identity).unwrap();

        let via_update = UpdateHandler
            .handle(&ConversationList::empty(), &payload, &ctx)
            .await;
        let inserted = ConversationList::empty().insert({
            let mut r = row("c1", "t1", 10);
            r.conversation.status = ConversationStatus::Paused;
            r
        });
        assert_eq!(via_update.as_slice(), inserted.as_slice());
    }

    #[tokio::test]
    async fn update_merges_partial_columns() {
        let ctx = ctx(FakeRepository::default());
        let list = ConversationList::new(vec![row("c1", "t1", 10), row("c2", "t1", 20)]);
        let mut delta = ConversationDelta::identity("c1".into(), "t1".into());
        delta.unread_count = Some(3);
        delta.has_unread = Some(true);
        delta.last_activity_at = Some(conversation("c1", "t1", 30).last_activity_at);
        let identity = ConversationDelta::identity("c1".into(), "t1".into());
        let payload = ChangePayload::update(Table::Conversations, &delta, &identity).unwrap();

        let next = UpdateHandler.handle(&list, &payload, &ctx).await;
        let first = &next.as_slice()[0];
        assert_eq!(first.id().as_str(), "c1");
        assert_eq!(first.conversation.unread_count, 3);
        assert_eq!(first.conversation.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn undecodable_update_is_dropped() {
        let ctx = ctx(FakeRepository::default());
        let list = ConversationList::new(vec![row("c1", "t1", 10)]);
        let payload = ChangePayload::update(
            Table::Conversations,
            &serde_json::json!({ "id": "c1", "tenant_id": "t1", "status": "archived" }),
            &serde_json::json!({ "id": "c1" }),
        )
        .unwrap();
        assert!(UpdateHandler.handle(&list, &payload, &ctx).await.same_instance(&list));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let ctx = ctx(FakeRepository::default());
        let list = ConversationList::new(vec![row("c1", "t1", 10)]);
        let payload = ChangePayload::delete(
            Table::Conversations,
            &serde_json::json!({ "id": "c1", "tenant_id": "t1" }),
        )
        .unwrap();

        let once = DeleteHandler.handle(&list, &payload, &ctx).await;
        assert!(once.is_empty());
        let twice = DeleteHandler.handle(&once, &payload, &ctx).await;
        assert!(twice.same_instance(&once));
    }
}
