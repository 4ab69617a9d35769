// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel subscription manager.
//!
//! Holds at most one live subscription, for one tenant, with one logical
//! channel per registered (table, event type) pair. Opening a subscription
//! for another tenant tears the previous one down first.
//!
//! Each subscription runs two tasks joined by a bounded queue:
//!
//! - the pump reads the tenant's events off the [`ChangeBus`] and forwards
//!   those with a registered handler, in commit order;
//! - the dispatcher applies handlers one event at a time and publishes each
//!   resulting list. An update therefore never overtakes an insert whose
//!   contact lookup is still in flight.

use std::collections::HashMap;
use std::sync::Arc;

use livia_core::TenantId;
use livia_realtime::{ChangeBus, ChangePayload, EventType, RecvError, Table, TenantReceiver};
use serde::Serialize;
use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::handlers::{ChangeHandler, HandlerContext};
use crate::list::ConversationList;

/// Lifecycle of the realtime feed behind a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Not mounted.
    Idle,
    /// Receiving events.
    Live,
    /// Mounted without a tenant id; nothing is subscribed.
    TenantMissing,
    /// Fell behind the bus and lost events. The list is stale until remounted.
    Dropped,
    /// The bus shut down.
    Closed,
}

/// Identity of one logical channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub tenant_id: TenantId,
    pub table: Table,
    pub event_type: EventType,
}

/// Where a subscription writes its results.
#[derive(Debug, Clone)]
pub struct ListSink {
    pub list: Arc<watch::Sender<ConversationList>>,
    pub status: Arc<watch::Sender<SubscriptionStatus>>,
}

type Routes = HashMap<(Table, EventType), Arc<dyn ChangeHandler>>;

struct Active {
    tenant_id: TenantId,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub struct SubscriptionManager {
    bus: ChangeBus,
    queue_capacity: usize,
    routes: Arc<Routes>,
    active: Option<Active>,
}

impl SubscriptionManager {
    /// Registers `handlers` by (table, event type). A later handler for the
    /// same pair replaces an earlier one.
    pub fn new(
        bus: ChangeBus,
        queue_capacity: usize,
        handlers: Vec<Arc<dyn ChangeHandler>>,
    ) -> Self {
        let mut routes: Routes = HashMap::new();
        for handler in handlers {
            let key = (handler.table(), handler.event_type());
            if routes.insert(key, handler).is_some() {
                warn!(table = %key.0, event = %key.1, "handler registered twice, keeping the last");
            }
        }
        Self {
            bus,
            queue_capacity: queue_capacity.max(1),
            routes: Arc::new(routes),
            active: None,
        }
    }

    /// Tenant of the live subscription, if any.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.active.as_ref().map(|a| &a.tenant_id)
    }

    /// True while a subscription is attached and its feed is still running.
    /// A feed that dropped or saw the bus close counts as not open.
    pub fn is_open(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !a.cancel.is_cancelled())
    }

    /// Logical channels currently open, sorted for stable output.
    pub fn keys(&self) -> Vec<SubscriptionKey> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        let mut keys: Vec<SubscriptionKey> = self
            .routes
            .keys()
            .map(|(table, event_type)| SubscriptionKey {
                tenant_id: active.tenant_id.clone(),
                table: *table,
                event_type: *event_type,
            })
            .collect();
        keys.sort_by_key(|k| (k.table.to_string(), k.event_type.to_string()));
        keys
    }

    /// Attaches a bus receiver for `tenant_id` without starting dispatch.
    ///
    /// Call this before loading the initial list so no event committed in
    /// between is missed; events that were already reflected in the load are
    /// no-ops for the handlers. A subscription of another tenant, or one whose
    /// feed has ended, is torn down first.
    pub async fn prepare(&mut self, tenant_id: &TenantId) -> TenantReceiver {
        if let Some(active) = &self.active
            && (active.tenant_id != *tenant_id || active.cancel.is_cancelled())
        {
            self.close().await;
        }
        self.bus.subscribe_tenant(tenant_id.clone())
    }

    /// Starts dispatching `receiver`'s events into `sink`.
    ///
    /// A no-op when a subscription for the same tenant is already live.
    pub async fn open(&mut self, receiver: TenantReceiver, ctx: HandlerContext, sink: ListSink) {
        if let Some(active) = &self.active {
            if active.tenant_id == ctx.tenant_id && !active.cancel.is_cancelled() {
                debug!(tenant_id = %ctx.tenant_id, "subscription already open");
                return;
            }
            self.close().await;
        }

        let cancel = CancellationToken::new();
        let (queue_tx, queue_rx) = mpsc::channel(self.queue_capacity);
        let tenant_id = ctx.tenant_id.clone();

        let pump = tokio::spawn(pump(
            receiver,
            Arc::clone(&self.routes),
            queue_tx,
            Arc::clone(&sink.status),
            cancel.clone(),
        ));
        let dispatcher = tokio::spawn(dispatch(
            queue_rx,
            Arc::clone(&self.routes),
            ctx,
            sink.list,
            cancel.clone(),
        ));

        sink.status.send_replace(SubscriptionStatus::Live);
        info!(tenant_id = %tenant_id, channels = self.routes.len(), "inbox subscription opened");
        self.active = Some(Active {
            tenant_id,
            cancel,
            tasks: vec![pump, dispatcher],
        });
    }

    /// Cancels dispatch and waits for both tasks to stop.
    pub async fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        for task in active.tasks {
            if let Err(e) = task.await
                && e.is_panic()
            {
                warn!(tenant_id = %active.tenant_id, "subscription task panicked");
            }
        }
        info!(tenant_id = %active.tenant_id, "inbox subscription closed");
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

async fn pump(
    mut receiver: TenantReceiver,
    routes: Arc<Routes>,
    queue: mpsc::Sender<Arc<ChangePayload>>,
    status: Arc<watch::Sender<SubscriptionStatus>>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = receiver.recv() => received,
        };
        match received {
            Ok(payload) => {
                if !routes.contains_key(&(payload.table, payload.event_type)) {
                    trace!(table = %payload.table, event = %payload.event_type, "no handler, skipping");
                    continue;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = queue.send(payload) => if sent.is_err() { break },
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    tenant_id = %receiver.tenant_id(),
                    skipped,
                    "inbox subscription lagged behind the bus, list is stale"
                );
                status.send_replace(SubscriptionStatus::Dropped);
                cancel.cancel();
                break;
            }
            Err(RecvError::Closed) => {
                info!(tenant_id = %receiver.tenant_id(), "change bus closed");
                status.send_replace(SubscriptionStatus::Closed);
                cancel.cancel();
                break;
            }
        }
    }
}

async fn dispatch(
    mut queue: mpsc::Receiver<Arc<ChangePayload>>,
    routes: Arc<Routes>,
    ctx: HandlerContext,
    list: Arc<watch::Sender<ConversationList>>,
    cancel: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            _ = cancel.cancelled() => break,
            next = queue.recv() => match next {
                Some(payload) => payload,
                None => break,
            },
        };
        let Some(handler) = routes.get(&(payload.table, payload.event_type)) else {
            continue;
        };

        let current = list.borrow().clone();
        // Cancellation aborts an in-flight repository fetch.
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = handler.handle(&current, &payload, &ctx) => next,
        };
        if !next.same_instance(&current) {
            list.send_replace(next);
        }
    }
}
