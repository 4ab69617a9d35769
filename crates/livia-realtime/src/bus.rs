// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process change bus.
//!
//! Storage publishes one [`ChangePayload`] per committed row change; the
//! inbox and the SSE endpoint subscribe. Delivery is commit order per
//! publisher. A subscriber that falls more than `capacity` events behind
//! observes [`RecvError::Lagged`] and must treat its view as stale.

use std::sync::Arc;

use tokio::sync::broadcast;
pub use tokio::sync::broadcast::error::RecvError;
use tracing::trace;

use livia_core::TenantId;

use crate::event::ChangePayload;

/// Fan-out channel for row change events.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<Arc<ChangePayload>>,
}

impl ChangeBus {
    /// Creates a bus buffering up to `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a change. Returns how many subscribers will see it.
    pub fn publish(&self, payload: ChangePayload) -> usize {
        trace!(
            table = %payload.table,
            event = %payload.event_type,
            tenant_id = payload.tenant_id().unwrap_or_default(),
            "publishing change"
        );
        // No subscribers is not an error: nobody is looking at the inbox.
        self.sender.send(Arc::new(payload)).unwrap_or(0)
    }

    /// Subscribes to every change on the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChangePayload>> {
        self.sender.subscribe()
    }

    /// Subscribes to the changes of a single tenant.
    pub fn subscribe_tenant(&self, tenant_id: TenantId) -> TenantReceiver {
        TenantReceiver {
            tenant_id,
            inner: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A bus receiver that skips events owned by other tenants.
#[derive(Debug)]
pub struct TenantReceiver {
    tenant_id: TenantId,
    inner: broadcast::Receiver<Arc<ChangePayload>>,
}

impl TenantReceiver {
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Waits for the next change owned by this receiver's tenant.
    pub async fn recv(&mut self) -> Result<Arc<ChangePayload>, RecvError> {
        loop {
            let payload = self.inner.recv().await?;
            if payload.tenant_id() == Some(self.tenant_id.as_str()) {
                return Ok(payload);
            }
        }
    }
}
