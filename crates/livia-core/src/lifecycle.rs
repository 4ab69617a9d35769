// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle rules.
//!
//! Every status change (agent action, tag automation) goes through
//! [`LifecycleAction::apply`], so the gateway and automation paths reject
//! the same invalid transitions with the same messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LiviaError;
use crate::types::ConversationStatus;

/// An agent- or automation-initiated status change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleAction {
    /// Hand the conversation to a human: AI stops answering.
    PauseAi,
    /// Give the conversation back to the AI.
    ResumeAi,
    /// Reopen a closed conversation.
    Reopen,
    /// Close the conversation.
    Close,
}

/// The validated outcome of a lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConversationStatus,
    pub to: ConversationStatus,
    pub ai_active: bool,
}

impl LifecycleAction {
    /// Validates the action against the current status.
    pub fn apply(self, current: ConversationStatus) -> Result<Transition, LiviaError> {
        use ConversationStatus::*;

        let (to, ai_active) = match (self, current) {
            (LifecycleAction::PauseAi, Open) => (Paused, false),
            (LifecycleAction::PauseAi, Paused) => {
                return Err(rejected("Conversa já está pausada"));
            }
            (LifecycleAction::PauseAi, Closed) => {
                return Err(rejected("Conversa encerrada não pode ser pausada"));
            }
            (LifecycleAction::ResumeAi, Paused) => (Open, true),
            (LifecycleAction::ResumeAi, _) => return Err(rejected("Conversa não está pausada")),
            (LifecycleAction::Reopen, Closed) => (Open, true),
            (LifecycleAction::Reopen, _) => {
                return Err(rejected("Apenas conversas encerradas podem ser reabertas"));
            }
            (LifecycleAction::Close, Open | Paused) => (Closed, false),
            (LifecycleAction::Close, Closed) => return Err(rejected("Conversa já está encerrada")),
        };

        Ok(Transition {
            from: current,
            to,
            ai_active,
        })
    }
}

/// Fails unless the conversation can receive outbound agent messages.
pub fn ensure_accepts_messages(status: ConversationStatus) -> Result<(), LiviaError> {
    if status == ConversationStatus::Closed {
        return Err(rejected("Conversa encerrada não aceita mensagens"));
    }
    Ok(())
}

fn rejected(message: &str) -> LiviaError {
    LiviaError::InvalidTransition(message.to_string())
}
