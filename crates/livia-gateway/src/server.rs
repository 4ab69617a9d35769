// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use livia_billing::{RetryPolicy, WalletLedger};
use livia_core::LiviaError;
use livia_realtime::ChangeBus;
use livia_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::workflow::WorkflowClient;
use crate::{handlers, sse, tags, wallet};

/// Shared state for axum request handlers.
///
/// Built once at startup; every field is cheap to clone.
#[derive(Clone)]
pub struct GatewayState {
    pub storage: Arc<SqliteStorage>,
    pub bus: ChangeBus,
    pub ledger: Arc<WalletLedger>,
    pub workflow: Arc<WorkflowClient>,
    pub retry: RetryPolicy,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Bind address for the gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full application router.
///
/// - `GET /health` (public)
/// - `/api/...` (bearer token required)
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/conversations", get(handlers::list_conversations))
        .route("/api/conversations/pause-ia", post(handlers::pause_ai))
        .route("/api/conversations/resume-ia", post(handlers::resume_ai))
        .route("/api/conversations/reopen", post(handlers::reopen))
        .route("/api/conversations/close", post(handlers::close))
        .route("/api/conversations/mark-read", post(handlers::mark_read))
        .route("/api/conversations/send-message", post(handlers::send_message))
        .route("/api/conversations/{id}/messages", get(handlers::list_messages))
        .route("/api/tags", get(tags::list_tags))
        .route("/api/tags/apply", post(tags::apply_tag))
        .route("/api/kanban", get(tags::kanban))
        .route("/api/wallet", get(wallet::get_wallet))
        .route("/api/realtime", get(sse::realtime))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the gateway until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), LiviaError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LiviaError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| LiviaError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
