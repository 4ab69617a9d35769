// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.
//!
//! Every mutating operation checks tenant ownership first, writes, and only
//! after the write committed publishes the matching change event on the bus.
//! Writes that publish hold the write-order lock until their events are on
//! the bus, so subscribers see changes in commit order.

use async_trait::async_trait;
use livia_config::model::StorageConfig;
use livia_core::lifecycle::ensure_accepts_messages;
use livia_core::{
    AuthenticatedUser, Contact, ContactId, Conversation, ConversationDelta, ConversationId,
    ConversationRepository, ConversationWithContact, HealthStatus, LifecycleAction, LiviaError,
    Message, MessageId, SenderRole, StorageAdapter, Tag, TagAssignment, TagId, TenantId,
    Transition, UserId,
};
use livia_realtime::{ChangeBus, ChangePayload, Table};
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::models::now_millis;
use crate::queries;
use crate::queries::messages::InboundRecord;

/// Attempts at a compare-and-set status change before giving up.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Outcome of applying a tag to a conversation.
#[derive(Debug, Clone)]
pub struct TagApplication {
    pub tag: Tag,
    pub assignment: TagAssignment,
    /// False when the tag was already attached.
    pub newly_applied: bool,
}

/// SQLite-backed storage.
///
/// The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
    bus: Option<ChangeBus>,
    write_order: Mutex<()>,
}

impl SqliteStorage {
    /// Create storage for the configured database path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            bus: None,
            write_order: Mutex::new(()),
        }
    }

    /// Publish committed changes on `bus`.
    pub fn with_bus(mut self, bus: ChangeBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// The open database, or an error before [`StorageAdapter::initialize`].
    pub fn database(&self) -> Result<&Database, LiviaError> {
        self.db.get().ok_or_else(|| LiviaError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Held from a publishing write until its events are published.
    async fn ordered(&self) -> MutexGuard<'_, ()> {
        self.write_order.lock().await
    }

    fn publish(&self, payload: Result<ChangePayload, LiviaError>) {
        let Some(bus) = &self.bus else {
            return;
        };
        match payload {
            Ok(payload) => {
                bus.publish(payload);
            }
            Err(e) => warn!(error = %e, "failed to encode change event"),
        }
    }

    fn publish_conversation_delta(&self, delta: &ConversationDelta) {
        let identity = ConversationDelta::identity(delta.id.clone(), delta.tenant_id.clone());
        self.publish(ChangePayload::update(Table::Conversations, delta, &identity));
    }

    // --- Tenants and users ---

    pub async fn create_tenant(&self, id: &TenantId, name: &str) -> Result<(), LiviaError> {
        queries::tenants::create_tenant(self.database()?, id, name).await
    }

    pub async fn list_tenant_ids(&self) -> Result<Vec<TenantId>, LiviaError> {
        queries::tenants::list_tenant_ids(self.database()?).await
    }

    pub async fn create_user(
        &self,
        user_id: &UserId,
        tenant_id: &TenantId,
        name: &str,
        token: &str,
    ) -> Result<(), LiviaError> {
        queries::tenants::create_user(self.database()?, user_id, tenant_id, name, token).await
    }

    /// Resolve a bearer token. Unknown tokens are `Unauthorized`.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, LiviaError> {
        queries::tenants::find_user_by_token(self.database()?, token)
            .await?
            .ok_or(LiviaError::Unauthorized)
    }

    // --- Contacts and conversations ---

    pub async fn create_contact(&self, contact: &Contact) -> Result<(), LiviaError> {
        queries::contacts::create_contact(self.database()?, contact).await
    }

    /// Insert a conversation and announce it.
    pub async fn create_conversation(&self, conversation: &Conversation) -> Result<(), LiviaError> {
        let _order = self.ordered().await;
        queries::conversations::insert_conversation(self.database()?, conversation).await?;
        self.publish(ChangePayload::insert(Table::Conversations, conversation));
        Ok(())
    }

    /// Load a conversation the caller's tenant owns.
    ///
    /// Missing rows are `NotFound`; rows of another tenant are
    /// `TenantMismatch` and logged as a security event.
    pub async fn owned_conversation(
        &self,
        tenant_id: &TenantId,
        id: &ConversationId,
    ) -> Result<Conversation, LiviaError> {
        if tenant_id.is_blank() {
            return Err(LiviaError::TenantMissing);
        }
        let conversation = queries::conversations::find_conversation(self.database()?, id)
            .await?
            .ok_or_else(|| LiviaError::not_found("conversation"))?;
        if conversation.tenant_id != *tenant_id {
            warn!(
                security = true,
                conversation_id = %id,
                caller_tenant = %tenant_id,
                owner_tenant = %conversation.tenant_id,
                "cross-tenant conversation access rejected"
            );
            return Err(LiviaError::TenantMismatch {
                resource: "conversation".into(),
            });
        }
        Ok(conversation)
    }

    /// Run a lifecycle action on a conversation.
    ///
    /// The rule is evaluated against the stored status and the write is a
    /// compare-and-set on that status, so a rejected action never mutates.
    pub async fn apply_action(
        &self,
        tenant_id: &TenantId,
        id: &ConversationId,
        action: LifecycleAction,
    ) -> Result<(Conversation, Transition), LiviaError> {
        let db = self.database()?;
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let mut conversation = self.owned_conversation(tenant_id, id).await?;
            let transition = action.apply(conversation.status)?;

            let _order = self.ordered().await;
            if queries::conversations::compare_and_set_status(db, id, tenant_id, transition).await?
            {
                conversation.status = transition.to;
                conversation.ai_active = transition.ai_active;

                let mut delta = ConversationDelta::identity(id.clone(), tenant_id.clone());
                delta.status = Some(transition.to);
                delta.ai_active = Some(transition.ai_active);
                self.publish_conversation_delta(&delta);

                info!(
                    conversation_id = %id,
                    tenant_id = %tenant_id,
                    %action,
                    from = %transition.from,
                    to = %transition.to,
                    "conversation status changed"
                );
                return Ok((conversation, transition));
            }
            debug!(conversation_id = %id, %action, "status changed concurrently, re-evaluating");
        }
        Err(LiviaError::Internal(format!(
            "conversation {id} kept changing while applying {action}"
        )))
    }

    /// Clear the unread counter of a conversation.
    pub async fn mark_read(
        &self,
        tenant_id: &TenantId,
        id: &ConversationId,
    ) -> Result<Conversation, LiviaError> {
        let mut conversation = self.owned_conversation(tenant_id, id).await?;
        let _order = self.ordered().await;
        if queries::conversations::mark_read(self.database()?, id, tenant_id).await? {
            let mut delta = ConversationDelta::identity(id.clone(), tenant_id.clone());
            delta.unread_count = Some(0);
            delta.has_unread = Some(false);
            self.publish_conversation_delta(&delta);
        }
        conversation.unread_count = 0;
        conversation.has_unread = false;
        Ok(conversation)
    }

    /// Append an agent message to a conversation.
    pub async fn send_agent_message(
        &self,
        tenant_id: &TenantId,
        id: &ConversationId,
        body: &str,
    ) -> Result<(Message, Conversation), LiviaError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(LiviaError::InvalidInput(
                "Mensagem não pode ser vazia".to_string(),
            ));
        }
        let conversation = self.owned_conversation(tenant_id, id).await?;
        ensure_accepts_messages(conversation.status)?;

        let message = Message {
            id: MessageId::from(uuid::Uuid::new_v4().to_string()),
            tenant_id: tenant_id.clone(),
            conversation_id: id.clone(),
            sender: SenderRole::Agent,
            body: body.to_string(),
            created_at: now_millis(),
        };
        let _order = self.ordered().await;
        let conversation = queries::messages::append_message(self.database()?, &message).await?;

        let mut delta = ConversationDelta::identity(id.clone(), tenant_id.clone());
        delta.last_activity_at = Some(conversation.last_activity_at);
        self.publish_conversation_delta(&delta);
        self.publish(ChangePayload::insert(Table::Messages, &message));

        Ok((message, conversation))
    }

    /// Record a message from the contact or the AI.
    ///
    /// Creates an open conversation when the contact has none.
    pub async fn record_inbound_message(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
        sender: SenderRole,
        body: &str,
    ) -> Result<InboundRecord, LiviaError> {
        if tenant_id.is_blank() {
            return Err(LiviaError::TenantMissing);
        }
        if sender == SenderRole::Agent {
            return Err(LiviaError::InvalidInput(
                "agent messages go through send_agent_message".to_string(),
            ));
        }
        let db = self.database()?;
        queries::contacts::get_contact(db, contact_id, tenant_id)
            .await?
            .ok_or_else(|| LiviaError::not_found("contact"))?;

        let order = self.ordered().await;
        let record =
            queries::messages::record_inbound(db, tenant_id, contact_id, sender, body, now_millis())
                .await?;

        if record.created {
            self.publish(ChangePayload::insert(
                Table::Conversations,
                &record.conversation,
            ));
        } else {
            let conversation = &record.conversation;
            let mut delta =
                ConversationDelta::identity(conversation.id.clone(), tenant_id.clone());
            delta.last_activity_at = Some(conversation.last_activity_at);
            delta.unread_count = Some(conversation.unread_count);
            delta.has_unread = Some(conversation.has_unread);
            self.publish_conversation_delta(&delta);
        }
        self.publish(ChangePayload::insert(Table::Messages, &record.message));
        drop(order);

        debug!(
            conversation_id = %record.conversation.id,
            created = record.created,
            %sender,
            "inbound message recorded"
        );
        Ok(record)
    }

    /// Thread of a conversation the caller owns, oldest first.
    pub async fn list_messages(
        &self,
        tenant_id: &TenantId,
        id: &ConversationId,
    ) -> Result<Vec<Message>, LiviaError> {
        self.owned_conversation(tenant_id, id).await?;
        queries::messages::list_messages(self.database()?, id, tenant_id).await
    }

    // --- Tags ---

    pub async fn create_tag(&self, tag: &Tag) -> Result<(), LiviaError> {
        queries::tags::create_tag(self.database()?, tag).await
    }

    pub async fn list_tags(&self, tenant_id: &TenantId) -> Result<Vec<Tag>, LiviaError> {
        queries::tags::list_tags(self.database()?, tenant_id).await
    }

    pub async fn list_tag_assignments(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<TagAssignment>, LiviaError> {
        queries::tags::list_assignments(self.database()?, tenant_id).await
    }

    /// Attach an active tag to a conversation. Re-applying is a no-op.
    pub async fn apply_tag(
        &self,
        tenant_id: &TenantId,
        conversation_id: &ConversationId,
        tag_id: &TagId,
    ) -> Result<TagApplication, LiviaError> {
        self.owned_conversation(tenant_id, conversation_id).await?;
        let db = self.database()?;
        let tag = queries::tags::find_tag(db, tag_id)
            .await?
            .ok_or_else(|| LiviaError::not_found("tag"))?;
        if tag.tenant_id != *tenant_id {
            warn!(
                security = true,
                tag_id = %tag_id,
                caller_tenant = %tenant_id,
                owner_tenant = %tag.tenant_id,
                "cross-tenant tag access rejected"
            );
            return Err(LiviaError::TenantMismatch {
                resource: "tag".into(),
            });
        }
        if !tag.active {
            return Err(LiviaError::InvalidInput(format!(
                "Etiqueta \"{}\" está inativa",
                tag.name
            )));
        }

        let assignment = TagAssignment {
            conversation_id: conversation_id.clone(),
            tag_id: tag_id.clone(),
            tenant_id: tenant_id.clone(),
            applied_at: now_millis(),
        };
        let _order = self.ordered().await;
        let newly_applied = queries::tags::assign_tag(db, &assignment).await?;
        if newly_applied {
            self.publish(ChangePayload::insert(Table::ConversationTags, &assignment));
        }
        Ok(TagApplication {
            tag,
            assignment,
            newly_applied,
        })
    }
}

#[async_trait]
impl ConversationRepository for SqliteStorage {
    async fn get_conversation(
        &self,
        id: &ConversationId,
        tenant_id: &TenantId,
    ) -> Result<Option<ConversationWithContact>, LiviaError> {
        queries::conversations::get_conversation(self.database()?, id, tenant_id).await
    }

    async fn list_conversations(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ConversationWithContact>, LiviaError> {
        queries::conversations::list_conversations(self.database()?, tenant_id).await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), LiviaError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| LiviaError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, LiviaError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), LiviaError> {
        let db = self.database()?;
        if self.config.wal_mode {
            db.checkpoint().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}
