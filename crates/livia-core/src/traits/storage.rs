// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backend lifecycle.

use async_trait::async_trait;

use crate::error::LiviaError;
use crate::types::HealthStatus;

/// Lifecycle of a persistence backend.
///
/// Constructed once at process start, initialized before the gateway
/// accepts requests, and closed on shutdown.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Opens connections and applies migrations.
    async fn initialize(&self) -> Result<(), LiviaError>;

    /// Reports whether the backend answers queries.
    async fn health_check(&self) -> Result<HealthStatus, LiviaError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), LiviaError>;
}
