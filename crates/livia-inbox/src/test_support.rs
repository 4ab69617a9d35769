// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory repository and row builders shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use livia_core::{
    Contact, ContactId, Conversation, ConversationId, ConversationRepository, ConversationStatus,
    ConversationWithContact, LiviaError, TenantId,
};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600 + secs, 0).unwrap()
}

pub fn conversation(id: &str, tenant: &str, activity: i64) -> Conversation {
    Conversation {
        id: ConversationId::from(id),
        tenant_id: TenantId::from(tenant),
        contact_id: ContactId::from(format!("ct-{id}")),
        status: ConversationStatus::Open,
        ai_active: true,
        last_activity_at: ts(activity),
        unread_count: 0,
        has_unread: false,
        created_at: ts(0),
    }
}

pub fn row(id: &str, tenant: &str, activity: i64) -> ConversationWithContact {
    let conversation = conversation(id, tenant, activity);
    ConversationWithContact {
        contact: Contact {
            id: conversation.contact_id.clone(),
            tenant_id: conversation.tenant_id.clone(),
            name: format!("Contato {id}"),
            phone: "+5511999990000".into(),
        },
        conversation,
    }
}

#[derive(Clone, Default)]
pub struct FakeRepository {
    rows: Arc<Mutex<Vec<ConversationWithContact>>>,
    failure: Option<String>,
    fetches: Arc<AtomicUsize>,
}

impl FakeRepository {
    pub fn with_rows(rows: Vec<ConversationWithContact>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            ..Self::default()
        }
    }

    pub fn failing(error: LiviaError) -> Self {
        Self {
            failure: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn push(&self, row: ConversationWithContact) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), LiviaError> {
        match &self.failure {
            Some(message) => Err(LiviaError::storage(std::io::Error::other(message.clone()))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConversationRepository for FakeRepository {
    async fn get_conversation(
        &self,
        id: &ConversationId,
        tenant_id: &TenantId,
    ) -> Result<Option<ConversationWithContact>, LiviaError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id && r.conversation.tenant_id == *tenant_id)
            .cloned())
    }

    async fn list_conversations(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ConversationWithContact>, LiviaError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.conversation.tenant_id == *tenant_id)
            .cloned()
            .collect())
    }
}
