// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation endpoints.
//!
//! Every handler runs under the bearer middleware and acts on the
//! authenticated user's tenant. A `tenant_id` sent by the client must match
//! it.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use livia_core::{
    AuthenticatedUser, Conversation, ConversationId, ConversationRepository,
    ConversationWithContact, HealthStatus, LifecycleAction, LiviaError, Message, StorageAdapter,
    TenantId,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::server::GatewayState;
use crate::workflow::WorkflowEvent;

/// Body of the lifecycle and mark-read endpoints.
#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

/// Body of `POST /api/conversations/send-message`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub body: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub conversation: Conversation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationWithContact>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Rejects a client-supplied tenant id that is not the caller's own.
pub(crate) fn ensure_tenant(
    user: &AuthenticatedUser,
    requested: Option<&TenantId>,
) -> Result<(), LiviaError> {
    match requested {
        Some(tenant) if *tenant != user.tenant_id => {
            warn!(
                security = true,
                user_id = %user.user_id,
                caller_tenant = %user.tenant_id,
                requested_tenant = %tenant,
                "request names a foreign tenant"
            );
            Err(LiviaError::TenantMismatch {
                resource: "tenant".into(),
            })
        }
        _ => Ok(()),
    }
}

async fn run_action(
    state: GatewayState,
    user: AuthenticatedUser,
    body: ConversationRequest,
    action: LifecycleAction,
) -> Result<Json<ConversationResponse>, ApiError> {
    ensure_tenant(&user, body.tenant_id.as_ref())?;
    let (conversation, transition) = state
        .storage
        .apply_action(&user.tenant_id, &body.conversation_id, action)
        .await?;

    let warning = state
        .workflow
        .deliver(&WorkflowEvent::StatusChanged {
            tenant_id: user.tenant_id.clone(),
            conversation_id: conversation.id.clone(),
            action,
            from: transition.from,
            to: transition.to,
            ai_active: transition.ai_active,
        })
        .await;

    Ok(Json(ConversationResponse {
        success: true,
        conversation,
        warning,
    }))
}

/// POST /api/conversations/pause-ia
pub async fn pause_ai(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    run_action(state, user, body, LifecycleAction::PauseAi).await
}

/// POST /api/conversations/resume-ia
pub async fn resume_ai(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    run_action(state, user, body, LifecycleAction::ResumeAi).await
}

/// POST /api/conversations/reopen
pub async fn reopen(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    run_action(state, user, body, LifecycleAction::Reopen).await
}

/// POST /api/conversations/close
pub async fn close(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    run_action(state, user, body, LifecycleAction::Close).await
}

/// POST /api/conversations/mark-read
pub async fn mark_read(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    ensure_tenant(&user, body.tenant_id.as_ref())?;
    let conversation = state
        .storage
        .mark_read(&user.tenant_id, &body.conversation_id)
        .await?;
    Ok(Json(ConversationResponse {
        success: true,
        conversation,
        warning: None,
    }))
}

/// POST /api/conversations/send-message
///
/// Stores the agent message, then asks the workflow engine to deliver it.
pub async fn send_message(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    ensure_tenant(&user, body.tenant_id.as_ref())?;
    let (message, conversation) = state
        .storage
        .send_agent_message(&user.tenant_id, &body.conversation_id, &body.body)
        .await?;

    let warning = state
        .workflow
        .deliver(&WorkflowEvent::SendMessage {
            tenant_id: user.tenant_id.clone(),
            conversation_id: conversation.id.clone(),
            contact_id: conversation.contact_id.clone(),
            message_id: message.id.clone(),
            body: message.body.clone(),
        })
        .await;

    Ok(Json(SendMessageResponse {
        success: true,
        message,
        warning,
    }))
}

/// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .storage
        .list_messages(&user.tenant_id, &ConversationId::from(id))
        .await?;
    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// GET /api/conversations
///
/// The tenant's inbox, most recent activity first.
pub async fn list_conversations(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conversations = state.storage.list_conversations(&user.tenant_id).await?;
    Ok(Json(ConversationsResponse {
        success: true,
        conversations,
    }))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> impl IntoResponse {
    let uptime_secs = state.start_time.elapsed().as_secs();
    let (code, status) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy".to_string()),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, format!("degraded: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {reason}"))
        }
        Err(e) => {
            warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy".to_string())
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
        }),
    )
}
