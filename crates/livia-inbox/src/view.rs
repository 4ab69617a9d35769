// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbox view: owner of a tenant's live conversation list.

use std::sync::Arc;

use livia_core::{ConversationRepository, LiviaError, TenantId};
use livia_realtime::ChangeBus;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::handlers::{ChangeHandler, HandlerContext, default_handlers};
use crate::list::ConversationList;
use crate::subscription::{ListSink, SubscriptionManager, SubscriptionStatus};

/// A mounted inbox.
///
/// Readers observe the list and the feed status through watch channels;
/// only the view's subscription writes to them.
pub struct InboxView {
    repository: Arc<dyn ConversationRepository>,
    manager: SubscriptionManager,
    sink: ListSink,
    tenant_id: Option<TenantId>,
}

impl InboxView {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        bus: ChangeBus,
        queue_capacity: usize,
    ) -> Self {
        Self::with_handlers(repository, bus, queue_capacity, default_handlers())
    }

    pub fn with_handlers(
        repository: Arc<dyn ConversationRepository>,
        bus: ChangeBus,
        queue_capacity: usize,
        handlers: Vec<Arc<dyn ChangeHandler>>,
    ) -> Self {
        let (list, _) = watch::channel(ConversationList::empty());
        let (status, _) = watch::channel(SubscriptionStatus::Idle);
        Self {
            repository,
            manager: SubscriptionManager::new(bus, queue_capacity, handlers),
            sink: ListSink {
                list: Arc::new(list),
                status: Arc::new(status),
            },
            tenant_id: None,
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    /// Current list.
    pub fn snapshot(&self) -> ConversationList {
        self.sink.list.borrow().clone()
    }

    pub fn watch_list(&self) -> watch::Receiver<ConversationList> {
        self.sink.list.subscribe()
    }

    pub fn status(&self) -> SubscriptionStatus {
        *self.sink.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SubscriptionStatus> {
        self.sink.status.subscribe()
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.manager
    }

    /// Loads the tenant's conversations and starts the realtime feed.
    ///
    /// A blank tenant id leaves the view without a subscription in the
    /// `TenantMissing` state.
    pub async fn mount(&mut self, tenant_id: TenantId) -> Result<(), LiviaError> {
        if tenant_id.is_blank() {
            self.manager.close().await;
            self.tenant_id = None;
            self.sink.list.send_replace(ConversationList::empty());
            self.sink.status.send_replace(SubscriptionStatus::TenantMissing);
            warn!("inbox mounted without a tenant id");
            return Err(LiviaError::TenantMissing);
        }
        if self.tenant_id.as_ref() == Some(&tenant_id) && self.manager.is_open() {
            return Ok(());
        }

        let receiver = self.manager.prepare(&tenant_id).await;
        let rows = match self.repository.list_conversations(&tenant_id).await {
            Ok(rows) => rows,
            Err(e) => {
                self.tenant_id = None;
                self.sink.status.send_replace(SubscriptionStatus::Idle);
                return Err(e);
            }
        };
        let count = rows.len();
        self.sink.list.send_replace(ConversationList::new(rows));

        let ctx = HandlerContext {
            tenant_id: tenant_id.clone(),
            repository: Arc::clone(&self.repository),
        };
        self.manager.open(receiver, ctx, self.sink.clone()).await;
        info!(tenant_id = %tenant_id, conversations = count, "inbox mounted");
        self.tenant_id = Some(tenant_id);
        Ok(())
    }

    /// Unmounts the current tenant and mounts `tenant_id`.
    pub async fn switch_tenant(&mut self, tenant_id: TenantId) -> Result<(), LiviaError> {
        if self.tenant_id.as_ref() != Some(&tenant_id) {
            self.unmount().await;
        }
        self.mount(tenant_id).await
    }

    /// Stops the feed and clears the list.
    pub async fn unmount(&mut self) {
        self.manager.close().await;
        self.tenant_id = None;
        self.sink.list.send_replace(ConversationList::empty());
        self.sink.status.send_replace(SubscriptionStatus::Idle);
    }
}
