// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound webhooks to the workflow-automation engine.
//!
//! Webhooks are side effects of a committed mutation. A failure never rolls
//! the mutation back: callers turn it into a soft warning via
//! [`WorkflowClient::deliver`].

use std::time::Duration;

use livia_config::model::WorkflowConfig;
use livia_core::{
    ContactId, ConversationId, ConversationStatus, LifecycleAction, LiviaError, MessageId, TagId,
    TenantId,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Payload posted to the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum WorkflowEvent {
    #[serde(rename = "conversation.status_changed")]
    StatusChanged {
        tenant_id: TenantId,
        conversation_id: ConversationId,
        action: LifecycleAction,
        from: ConversationStatus,
        to: ConversationStatus,
        ai_active: bool,
    },
    /// An agent reply to deliver over WhatsApp.
    #[serde(rename = "message.send")]
    SendMessage {
        tenant_id: TenantId,
        conversation_id: ConversationId,
        contact_id: ContactId,
        message_id: MessageId,
        body: String,
    },
    /// Automatic reply configured on a tag.
    #[serde(rename = "tag.auto_reply")]
    AutoReply {
        tenant_id: TenantId,
        conversation_id: ConversationId,
        tag_id: TagId,
        body: String,
    },
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::StatusChanged { .. } => "conversation.status_changed",
            WorkflowEvent::SendMessage { .. } => "message.send",
            WorkflowEvent::AutoReply { .. } => "tag.auto_reply",
        }
    }
}

/// HTTP client for the workflow engine. Disabled when no URL is configured.
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    client: reqwest::Client,
    url: Option<String>,
    timeout: Duration,
}

impl WorkflowClient {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, LiviaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LiviaError::Webhook {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn from_config(config: &WorkflowConfig) -> Result<Self, LiviaError> {
        Self::new(
            config.webhook_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// A client that never sends anything.
    pub fn disabled() -> Result<Self, LiviaError> {
        Self::new(None, Duration::from_secs(10))
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Posts `event`. Timeouts and non-2xx responses are errors.
    pub async fn send(&self, event: &WorkflowEvent) -> Result<(), LiviaError> {
        let Some(url) = &self.url else {
            debug!(event = event.name(), "workflow webhook disabled, skipping");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LiviaError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    LiviaError::Webhook {
                        message: format!("request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LiviaError::Webhook {
                message: format!("workflow engine returned {status}: {body}"),
                source: None,
            });
        }
        debug!(event = event.name(), %status, "workflow webhook delivered");
        Ok(())
    }

    /// Like [`send`](Self::send), but logs failures and returns them as a
    /// user-facing warning instead of an error.
    pub async fn deliver(&self, event: &WorkflowEvent) -> Option<String> {
        match self.send(event).await {
            Ok(()) => None,
            Err(e) => {
                warn!(event = event.name(), error = %e, "workflow webhook failed");
                Some(format!(
                    "Ação concluída, mas a automação não foi notificada ({})",
                    event.name()
                ))
            }
        }
    }
}
