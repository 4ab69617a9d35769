// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the LIVIA inbox service.

use thiserror::Error;

/// The primary error type used across all LIVIA crates.
#[derive(Debug, Error)]
pub enum LiviaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The request carried no valid credentials.
    #[error("authentication required")]
    Unauthorized,

    /// The authenticated user tried to touch a row owned by another tenant.
    #[error("tenant mismatch on {resource}")]
    TenantMismatch { resource: String },

    /// No tenant id was available for a tenant-scoped operation.
    #[error("tenant id missing")]
    TenantMissing,

    /// The referenced resource does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// A lifecycle action is not allowed from the current state.
    ///
    /// The message is user-facing and returned verbatim by the gateway.
    #[error("{0}")]
    InvalidTransition(String),

    /// The request body is syntactically valid but semantically unusable.
    #[error("{0}")]
    InvalidInput(String),

    /// A wallet debit would leave the balance negative.
    #[error("insufficient credits: balance {balance}, requested {requested}")]
    InsufficientCredits { balance: i64, requested: i64 },

    /// Outbound webhook to the workflow engine failed (timeout, non-2xx, transport).
    #[error("webhook error: {message}")]
    Webhook {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A realtime payload could not be decoded into the typed row schema.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LiviaError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LiviaError::Storage {
            source: Box::new(err),
        }
    }

    /// Shorthand for a not-found error on the named resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        LiviaError::NotFound {
            resource: resource.into(),
        }
    }

    /// True for failures worth retrying (storage hiccups, timeouts).
    ///
    /// Authorization, validation, and not-found errors are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, LiviaError::Storage { .. } | LiviaError::Timeout { .. })
    }
}
