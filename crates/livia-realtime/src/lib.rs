// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime change events for the LIVIA inbox.
//!
//! Defines the row-level change payload that storage emits after each
//! committed write and the broadcast bus that carries it to subscribers.

pub mod bus;
pub mod event;

pub use bus::{ChangeBus, RecvError, TenantReceiver};
pub use event::{ChangePayload, EventType, Table};
