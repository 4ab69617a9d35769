// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the LIVIA inbox service.
//!
//! axum router with bearer authentication, conversation lifecycle and
//! messaging endpoints, tags and kanban, the wallet read path, a realtime
//! SSE stream, and the workflow webhook client.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod server;
pub mod sse;
pub mod tags;
pub mod wallet;
pub mod workflow;

pub use error::{ApiError, ErrorResponse};
pub use extract::ApiJson;
pub use server::{GatewayState, ServerConfig, router, start_server};
pub use workflow::{WorkflowClient, WorkflowEvent};
