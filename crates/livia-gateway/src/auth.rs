// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token authentication.
//!
//! `Authorization: Bearer <token>` is resolved to an [`AuthenticatedUser`]
//! and attached to the request extensions. Every failure is a 401; the
//! tenant of the user scopes all later queries.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use livia_core::{AuthenticatedUser, LiviaError};

use crate::error::ApiError;
use crate::server::GatewayState;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return ApiError(LiviaError::Unauthorized).into_response();
    };

    let user: AuthenticatedUser = match state.storage.authenticate(token).await {
        Ok(user) => user,
        Err(LiviaError::Unauthorized) => {
            tracing::debug!("bearer token rejected");
            return ApiError(LiviaError::Unauthorized).into_response();
        }
        Err(e) => return ApiError(e).into_response(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}
