// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events stream of a tenant's row changes.
//!
//! SSE event format:
//! ```text
//! event: change
//! data: {"eventType":"UPDATE","schema":"public","table":"conversations",...}
//!
//! event: lagged
//! data: {"skipped": 12}
//! ```
//!
//! A client that falls behind gets one `lagged` event and the stream ends.
//! Reconnecting and reloading is up to the client.

use std::convert::Infallible;

use axum::{
    Extension,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use livia_core::AuthenticatedUser;
use livia_realtime::{RecvError, TenantReceiver};
use tracing::{debug, warn};

use crate::server::GatewayState;

enum Feed {
    Open(TenantReceiver),
    Done,
}

/// GET /api/realtime
pub async fn realtime(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.bus.subscribe_tenant(user.tenant_id.clone());
    debug!(tenant_id = %user.tenant_id, "realtime stream opened");
    Sse::new(change_stream(receiver)).keep_alive(KeepAlive::default())
}

/// Turns a tenant receiver into SSE events.
pub fn change_stream(receiver: TenantReceiver) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Feed::Open(receiver), |feed| async move {
        let Feed::Open(mut receiver) = feed else {
            return None;
        };
        loop {
            match receiver.recv().await {
                Ok(payload) => match Event::default().event("change").json_data(&*payload) {
                    Ok(event) => return Some((Ok(event), Feed::Open(receiver))),
                    Err(e) => {
                        warn!(error = %e, "failed to encode change event, skipping");
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(tenant_id = %receiver.tenant_id(), skipped, "realtime client lagged, closing stream");
                    let event = Event::default()
                        .event("lagged")
                        .data(serde_json::json!({ "skipped": skipped }).to_string());
                    return Some((Ok(event), Feed::Done));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use livia_core::TenantId;
    use livia_realtime::{ChangeBus, ChangePayload, Table};

    fn change(tenant: &str, id: &str) -> ChangePayload {
        ChangePayload::insert(
            Table::Conversations,
            &serde_json::json!({ "id": id, "tenant_id": tenant }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stream_yields_only_own_tenant_changes() {
        let bus = ChangeBus::new(8);
        let stream = change_stream(bus.subscribe_tenant(TenantId::from("t1")));
        bus.publish(change("t2", "theirs"));
        bus.publish(change("t1", "mine"));
        drop(bus);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn lagged_client_gets_one_event_then_end() {
        let bus = ChangeBus::new(2);
        let stream = change_stream(bus.subscribe_tenant(TenantId::from("t1")));
        for i in 0..6 {
            bus.publish(change("t1", &format!("c{i}")));
        }

        // One `lagged` event, then the stream is over even though the bus
        // is still alive.
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
        drop(bus);
    }
}
