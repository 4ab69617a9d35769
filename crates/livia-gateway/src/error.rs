// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`LiviaError`] onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use livia_core::LiviaError;
use serde::Serialize;
use tracing::error;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// A handler error. Wraps [`LiviaError`] so handlers can use `?`.
#[derive(Debug)]
pub struct ApiError(pub LiviaError);

impl From<LiviaError> for ApiError {
    fn from(err: LiviaError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LiviaError::Unauthorized => StatusCode::UNAUTHORIZED,
            LiviaError::TenantMismatch { .. } | LiviaError::TenantMissing => StatusCode::FORBIDDEN,
            LiviaError::NotFound { .. } => StatusCode::NOT_FOUND,
            LiviaError::InvalidTransition(_)
            | LiviaError::InvalidInput(_)
            | LiviaError::InsufficientCredits { .. } => StatusCode::BAD_REQUEST,
            LiviaError::Config(_)
            | LiviaError::Storage { .. }
            | LiviaError::Webhook { .. }
            | LiviaError::Decode { .. }
            | LiviaError::Timeout { .. }
            | LiviaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            LiviaError::Unauthorized => "Não autorizado".to_string(),
            LiviaError::TenantMismatch { .. } | LiviaError::TenantMissing => {
                "Acesso negado".to_string()
            }
            LiviaError::NotFound { resource } => format!("{resource} not found"),
            LiviaError::InvalidTransition(message) | LiviaError::InvalidInput(message) => {
                message.clone()
            }
            LiviaError::InsufficientCredits { .. } => "Saldo insuficiente".to_string(),
            _ => "Erro interno do servidor".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (LiviaError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                LiviaError::TenantMismatch {
                    resource: "conversation".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (LiviaError::not_found("conversation"), StatusCode::NOT_FOUND),
            (
                LiviaError::InvalidTransition("Conversa já está pausada".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LiviaError::storage(std::io::Error::other("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn transition_message_is_returned_verbatim() {
        let err = ApiError(LiviaError::InvalidTransition("Conversa já está pausada".into()));
        assert_eq!(err.message(), "Conversa já está pausada");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = ApiError(LiviaError::storage(std::io::Error::other("/var/lib/livia.db locked")));
        assert!(!err.message().contains("livia.db"));
    }
}
