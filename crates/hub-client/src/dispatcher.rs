//! Builds the handler bundle that translates transport callbacks into state
//! mutations.
//!
//! Registered exactly once at construction, before the connection is
//! started.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, info, trace, warn};

use chatline_protocol::ServerEvent;

use crate::lifecycle::{ClientContext, spawn_start_loop};
use crate::transport::HubCallbacks;
use crate::types::ConnectionState;

/// Creates the [`HubCallbacks`] bundle for a client context.
pub(crate) fn hub_callbacks(ctx: Arc<ClientContext>) -> HubCallbacks {
    let ctx_ev = ctx.clone();
    let on_event = Box::new(move |event: ServerEvent| match event {
        ServerEvent::ReceiveMessage(msg) => {
            trace!(user = %msg.user, "chat message received");
            // Append-only: the log is never mutated or truncated, and every
            // append republishes the snapshot.
            ctx_ev.messages_tx.send_modify(|log| log.push(msg));
        }
        ServerEvent::ConnectedUser(users) => {
            debug!(count = users.len(), "roster snapshot received");
            // Wholesale replacement: the hub is the authority on membership.
            ctx_ev.users_tx.send_replace(users);
        }
    });

    // The transport must not fire these after stop, but a late callback
    // still cannot be allowed to undo the terminal Disconnected.
    let ctx_rc = ctx.clone();
    let on_reconnecting = Box::new(move || {
        if ctx_rc.stopped.load(Ordering::Relaxed) {
            debug!("ignoring transport reconnect after stop");
            return;
        }
        warn!("hub connection lost, transport is reconnecting");
        ctx_rc.set_state(ConnectionState::Reconnecting);
    });

    let ctx_rd = ctx.clone();
    let on_reconnected = Box::new(move || {
        if ctx_rd.stopped.load(Ordering::Relaxed) {
            debug!("ignoring transport recovery after stop");
            return;
        }
        info!("hub connection restored by transport");
        ctx_rd.set_state(ConnectionState::Connected);
    });

    let on_close = Box::new(move || {
        ctx.set_state(ConnectionState::Disconnected);
        if ctx.stopped.load(Ordering::Relaxed) {
            debug!("hub connection closed after stop");
        } else {
            warn!("hub connection closed, re-entering retry loop");
            spawn_start_loop(ctx.clone());
        }
    });

    HubCallbacks {
        on_event,
        on_reconnecting,
        on_reconnected,
        on_close,
    }
}
