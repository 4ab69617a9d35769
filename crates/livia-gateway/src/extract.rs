// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON body extractor that rejects through [`ApiError`].

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use livia_core::LiviaError;
use tracing::debug;

use crate::error::ApiError;

/// Like [`Json`], but a missing, malformed or mistyped body becomes a
/// 400 with the usual `{ "error" }` body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let detail = rejection.body_text();
                debug!(status = %rejection.status(), %detail, "request body rejected");
                Err(ApiError(LiviaError::InvalidInput(format!(
                    "Requisição inválida: {detail}"
                ))))
            }
        }
    }
}
