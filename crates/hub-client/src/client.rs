//! The chat client: connection lifecycle owner and state broadcaster.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};

use chatline_protocol::ChatMessage;

use crate::dispatcher;
use crate::lifecycle::{self, ClientContext};
use crate::transport::HubConnection;
use crate::types::{ClientEvent, ConnectionState, RetryConfig};

/// Chat client bound to a single hub connection.
///
/// Owns the connection lifecycle and exposes two hot, stateful streams: the
/// append-only message log and the connected-user roster. Both replay their
/// latest snapshot to new subscribers.
///
/// The instance is not reusable after [`stop`](Self::stop).
pub struct ChatClient {
    pub(crate) ctx: Arc<ClientContext>,
    events_rx: Mutex<Option<mpsc::Receiver<ClientEvent>>>,
}

impl ChatClient {
    /// Creates a client and immediately begins establishing the connection.
    ///
    /// Event handlers are bound before the first start attempt, so no
    /// inbound event can race the registration. Must be called within a
    /// tokio runtime.
    pub fn connect(connection: Arc<dyn HubConnection>, retry: RetryConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (messages_tx, _) = watch::channel(Vec::new());
        let (users_tx, _) = watch::channel(Vec::new());

        let ctx = Arc::new(ClientContext {
            connection,
            state_tx,
            messages_tx,
            users_tx,
            events_tx,
            retry,
            retry_cancel: std::sync::Mutex::new(None),
            stopped: AtomicBool::new(false),
        });

        ctx.connection.set_callbacks(dispatcher::hub_callbacks(ctx.clone()));
        lifecycle::spawn_start_loop(ctx.clone());

        Self {
            ctx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// The message log stream. Replays the current snapshot immediately;
    /// every append publishes a new one.
    pub fn messages(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.ctx.messages_tx.subscribe()
    }

    /// The connected-user roster stream. Replaced wholesale on every roster
    /// event from the hub.
    pub fn connected_users(&self) -> watch::Receiver<Vec<String>> {
        self.ctx.users_tx.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.ctx.state_tx.borrow()
    }

    /// Connection state as a stream.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.ctx.state_tx.subscribe()
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ClientEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Requests graceful shutdown. Best-effort: failure during stop is
    /// logged, not retried, and the state always ends `Disconnected`.
    /// Terminal for this client instance.
    pub async fn stop(&self) {
        self.ctx.stopped.store(true, Ordering::Relaxed);
        lifecycle::cancel_any_retry(&self.ctx.retry_cancel);

        if let Err(e) = self.ctx.connection.stop().await {
            warn!(error = %e, "error while stopping hub connection");
        }
        self.ctx.set_state(ConnectionState::Disconnected);
        debug!("chat client stopped");
    }
}
