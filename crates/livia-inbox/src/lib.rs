// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime inbox for the LIVIA service.
//!
//! Keeps a tenant's conversation list in sync with committed row changes:
//! an immutable [`ConversationList`] reduced by per-event [`ChangeHandler`]s,
//! fed by a [`SubscriptionManager`] and owned by an [`InboxView`]. Also
//! provides thread scroll bookkeeping and the CRM kanban grouping.

pub mod handlers;
pub mod kanban;
pub mod list;
pub mod scroll;
pub mod subscription;
pub mod view;

#[cfg(test)]
mod test_support;

pub use handlers::{
    ChangeHandler, DeleteHandler, HandlerContext, InsertHandler, UpdateHandler, default_handlers,
};
pub use kanban::{KanbanColumn, UNCATEGORIZED, group_by_category};
pub use list::ConversationList;
pub use scroll::{ScrollBehavior, ScrollState, ScrollTracker};
pub use subscription::{ListSink, SubscriptionKey, SubscriptionManager, SubscriptionStatus};
pub use view::InboxView;
