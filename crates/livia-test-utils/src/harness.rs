// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end HTTP testing.
//!
//! `TestHarness` assembles the full gateway stack over a temp SQLite
//! database with two seeded tenants, and drives the router in-process with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use livia_billing::{RetryPolicy, WalletLedger};
use livia_config::model::StorageConfig;
use livia_core::{
    Contact, ContactId, Conversation, ConversationId, ConversationRepository, ConversationStatus,
    LiviaError, StorageAdapter, Tag, TagAutomation, TagId, TagType, TenantId, UserId,
};
use livia_gateway::{GatewayState, WorkflowClient, router};
use livia_realtime::ChangeBus;
use livia_storage::{SqliteStorage, now_millis};
use serde_json::Value;
use tower::ServiceExt;

/// A seeded tenant with one agent and one contact.
#[derive(Debug, Clone)]
pub struct SeededTenant {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub token: String,
    pub contact_id: ContactId,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    webhook_url: Option<String>,
    webhook_timeout: Duration,
    retry: RetryPolicy,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout: Duration::from_secs(2),
            retry: RetryPolicy::new(2, Duration::from_millis(1)),
        }
    }

    /// Point workflow webhooks at `url` (e.g. a wiremock server).
    pub fn with_webhook(mut self, url: impl Into<String>, timeout: Duration) -> Self {
        self.webhook_url = Some(url.into());
        self.webhook_timeout = timeout;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LiviaError> {
        let temp_dir = tempfile::TempDir::new().map_err(LiviaError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let bus = ChangeBus::new(256);
        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        })
        .with_bus(bus.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let ledger = Arc::new(WalletLedger::from_database(storage.database()?));
        let workflow = Arc::new(WorkflowClient::new(self.webhook_url, self.webhook_timeout)?);

        let tenant_a = seed_tenant(&storage, "a").await?;
        let tenant_b = seed_tenant(&storage, "b").await?;

        let state = GatewayState {
            storage: Arc::clone(&storage),
            bus: bus.clone(),
            ledger: Arc::clone(&ledger),
            workflow,
            retry: self.retry,
            start_time: std::time::Instant::now(),
        };

        Ok(TestHarness {
            router: router(state),
            storage,
            ledger,
            bus,
            tenant_a,
            tenant_b,
            _temp_dir: temp_dir,
        })
    }
}

async fn seed_tenant(storage: &SqliteStorage, suffix: &str) -> Result<SeededTenant, LiviaError> {
    let seeded = SeededTenant {
        tenant_id: TenantId::from(format!("tenant-{suffix}")),
        user_id: UserId::from(format!("user-{suffix}")),
        token: format!("token-{suffix}"),
        contact_id: ContactId::from(format!("contact-{suffix}")),
    };
    storage
        .create_tenant(&seeded.tenant_id, &format!("Tenant {suffix}"))
        .await?;
    storage
        .create_user(&seeded.user_id, &seeded.tenant_id, "Agente", &seeded.token)
        .await?;
    storage
        .create_contact(&Contact {
            id: seeded.contact_id.clone(),
            tenant_id: seeded.tenant_id.clone(),
            name: format!("Cliente {suffix}"),
            phone: format!("+55119990000{suffix}"),
        })
        .await?;
    Ok(seeded)
}

/// Test harness for end-to-end HTTP testing.
///
/// The temp database lives as long as the harness.
pub struct TestHarness {
    pub router: Router,
    pub storage: Arc<SqliteStorage>,
    pub ledger: Arc<WalletLedger>,
    pub bus: ChangeBus,
    pub tenant_a: SeededTenant,
    pub tenant_b: SeededTenant,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Insert a conversation for `tenant`'s contact in the given status.
    pub async fn seed_conversation(
        &self,
        tenant: &SeededTenant,
        status: ConversationStatus,
    ) -> Result<ConversationId, LiviaError> {
        let now = now_millis();
        let conversation = Conversation {
            id: ConversationId::from(uuid::Uuid::new_v4().to_string()),
            tenant_id: tenant.tenant_id.clone(),
            contact_id: tenant.contact_id.clone(),
            status,
            ai_active: status == ConversationStatus::Open,
            last_activity_at: now,
            unread_count: 0,
            has_unread: false,
            created_at: now,
        };
        self.storage.create_conversation(&conversation).await?;
        Ok(conversation.id)
    }

    /// Insert an active tag for `tenant`.
    pub async fn seed_tag(
        &self,
        tenant: &SeededTenant,
        name: &str,
        is_category: bool,
        automation: TagAutomation,
    ) -> Result<TagId, LiviaError> {
        let tag = Tag {
            id: TagId::from(uuid::Uuid::new_v4().to_string()),
            tenant_id: tenant.tenant_id.clone(),
            name: name.to_string(),
            color: "#6366f1".to_string(),
            tag_type: TagType::Description,
            active: true,
            is_category,
            automation,
            created_at: now_millis(),
        };
        self.storage.create_tag(&tag).await?;
        Ok(tag.id)
    }

    /// Current stored state of a conversation.
    pub async fn conversation(
        &self,
        tenant: &SeededTenant,
        id: &ConversationId,
    ) -> Result<Conversation, LiviaError> {
        self.storage
            .get_conversation(id, &tenant.tenant_id)
            .await?
            .map(|row| row.conversation)
            .ok_or_else(|| LiviaError::not_found("conversation"))
    }

    /// Sends a request through the router. Returns the status and the JSON
    /// body (`Value::Null` when the body is empty or not JSON).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("valid test request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    /// Flush and release the database.
    pub async fn shutdown(self) -> Result<(), LiviaError> {
        self.storage.close().await
    }
}
