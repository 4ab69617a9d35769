// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag endpoints and the CRM kanban board.

use axum::{Extension, Json, extract::State};
use livia_core::{
    AuthenticatedUser, Conversation, ConversationId, ConversationRepository, LiviaError, Tag,
    TagId, TenantId,
};
use livia_inbox::{ConversationList, KanbanColumn, group_by_category};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::handlers::ensure_tenant;
use crate::server::GatewayState;
use crate::workflow::WorkflowEvent;

/// Body of `POST /api/tags/apply`.
#[derive(Debug, Deserialize)]
pub struct ApplyTagRequest {
    pub conversation_id: ConversationId,
    pub tag_id: TagId,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Serialize)]
pub struct ApplyTagResponse {
    pub success: bool,
    /// False when the tag was already attached; automation did not run again.
    pub applied: bool,
    pub tag: Tag,
    /// The conversation after a status automation, when one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<Conversation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub success: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct KanbanResponse {
    pub success: bool,
    pub columns: Vec<KanbanColumn>,
}

/// POST /api/tags/apply
///
/// Attaches the tag and, on first application, runs its automation. A
/// status change the lifecycle rules reject is skipped, not reported as an
/// error.
pub async fn apply_tag(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<ApplyTagRequest>,
) -> Result<Json<ApplyTagResponse>, ApiError> {
    ensure_tenant(&user, body.tenant_id.as_ref())?;
    let tenant_id = &user.tenant_id;
    let application = state
        .storage
        .apply_tag(tenant_id, &body.conversation_id, &body.tag_id)
        .await?;

    let mut conversation = None;
    let mut warnings = Vec::new();

    if application.newly_applied {
        let automation = &application.tag.automation;

        if let Some(action) = automation.action {
            match state
                .storage
                .apply_action(tenant_id, &body.conversation_id, action)
                .await
            {
                Ok((updated, transition)) => {
                    if let Some(warning) = state
                        .workflow
                        .deliver(&WorkflowEvent::StatusChanged {
                            tenant_id: tenant_id.clone(),
                            conversation_id: updated.id.clone(),
                            action,
                            from: transition.from,
                            to: transition.to,
                            ai_active: transition.ai_active,
                        })
                        .await
                    {
                        warnings.push(warning);
                    }
                    conversation = Some(updated);
                }
                Err(LiviaError::InvalidTransition(reason)) => {
                    info!(
                        tag_id = %body.tag_id,
                        conversation_id = %body.conversation_id,
                        %action,
                        %reason,
                        "tag automation skipped"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(reply) = automation.auto_reply.as_deref().map(str::trim)
            && !reply.is_empty()
            && let Some(warning) = state
                .workflow
                .deliver(&WorkflowEvent::AutoReply {
                    tenant_id: tenant_id.clone(),
                    conversation_id: body.conversation_id.clone(),
                    tag_id: body.tag_id.clone(),
                    body: reply.to_string(),
                })
                .await
        {
            warnings.push(warning);
        }
    }

    Ok(Json(ApplyTagResponse {
        success: true,
        applied: application.newly_applied,
        tag: application.tag,
        conversation,
        warnings,
    }))
}

/// GET /api/tags
pub async fn list_tags(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<TagsResponse>, ApiError> {
    let tags = state.storage.list_tags(&user.tenant_id).await?;
    Ok(Json(TagsResponse {
        success: true,
        tags,
    }))
}

/// GET /api/kanban
pub async fn kanban(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<KanbanResponse>, ApiError> {
    let tenant_id = &user.tenant_id;
    let conversations =
        ConversationList::new(state.storage.list_conversations(tenant_id).await?);
    let tags = state.storage.list_tags(tenant_id).await?;
    let assignments = state.storage.list_tag_assignments(tenant_id).await?;

    Ok(Json(KanbanResponse {
        success: true,
        columns: group_by_category(conversations.as_slice(), &tags, &assignments),
    }))
}
