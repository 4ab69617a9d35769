// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row-level change payloads.
//!
//! Wire shape:
//! ```json
//! { "eventType": "UPDATE", "schema": "public", "table": "conversations",
//!   "commit_timestamp": "2026-01-01T00:00:00.000Z",
//!   "new": { "id": "c1", "tenant_id": "t1", "status": "paused" },
//!   "old": { "id": "c1", "tenant_id": "t1" } }
//! ```
//!
//! `new` and `old` stay untyped on the wire and are decoded into typed rows
//! (for example [`livia_core::ConversationDelta`]) by the consumer.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use livia_core::LiviaError;

/// Schema name carried by every payload.
pub const DEFAULT_SCHEMA: &str = "public";

/// Kind of row change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

/// Tables that publish change events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Conversations,
    Messages,
    ConversationTags,
}

/// One committed row change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    pub schema: String,
    pub table: Table,
    pub commit_timestamp: DateTime<Utc>,
    /// Columns after the change. Empty for deletes.
    #[serde(default)]
    pub new: Map<String, Value>,
    /// Columns before the change. Carries at least the identity for updates and deletes.
    #[serde(default)]
    pub old: Map<String, Value>,
}

impl ChangePayload {
    /// Insert event carrying the full row.
    pub fn insert<T: Serialize>(table: Table, row: &T) -> Result<Self, LiviaError> {
        Ok(Self::build(EventType::Insert, table, to_object(row)?, Map::new()))
    }

    /// Update event; `new` may be a partial row.
    pub fn update<N, O>(table: Table, new: &N, old: &O) -> Result<Self, LiviaError>
    where
        N: Serialize,
        O: Serialize,
    {
        Ok(Self::build(
            EventType::Update,
            table,
            to_object(new)?,
            to_object(old)?,
        ))
    }

    /// Delete event carrying the identity of the removed row.
    pub fn delete<O: Serialize>(table: Table, old: &O) -> Result<Self, LiviaError> {
        Ok(Self::build(EventType::Delete, table, Map::new(), to_object(old)?))
    }

    fn build(
        event_type: EventType,
        table: Table,
        new: Map<String, Value>,
        old: Map<String, Value>,
    ) -> Self {
        Self {
            event_type,
            schema: DEFAULT_SCHEMA.to_string(),
            table,
            commit_timestamp: Utc::now(),
            new,
            old,
        }
    }

    /// Owning tenant, read from `new` and falling back to `old`.
    pub fn tenant_id(&self) -> Option<&str> {
        self.column_str("tenant_id")
    }

    /// Primary key of the changed row.
    pub fn record_id(&self) -> Option<&str> {
        self.column_str("id")
    }

    fn column_str(&self, column: &str) -> Option<&str> {
        self.new
            .get(column)
            .or_else(|| self.old.get(column))
            .and_then(Value::as_str)
    }

    /// Decodes `new` into a typed row.
    pub fn decode_new<T: DeserializeOwned>(&self) -> Result<T, LiviaError> {
        decode(&self.new, self.table, "new")
    }
}

fn to_object<T: Serialize>(row: &T) -> Result<Map<String, Value>, LiviaError> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(LiviaError::Decode {
            message: format!("change row must be a JSON object, got {other}"),
        }),
        Err(e) => Err(LiviaError::Decode {
            message: format!("failed to encode change row: {e}"),
        }),
    }
}

fn decode<T: DeserializeOwned>(
    columns: &Map<String, Value>,
    table: Table,
    side: &str,
) -> Result<T, LiviaError> {
    serde_json::from_value(Value::Object(columns.clone())).map_err(|e| LiviaError::Decode {
        message: format!("{table}.{side}: {e}"),
    })
}
