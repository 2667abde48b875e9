//! Connection lifecycle: shared client context and the fixed-delay retry
//! loop.
//!
//! Two layers of recovery exist. The transport runs its own short-horizon,
//! bounded reconnection and reports it via callbacks; the loop here is the
//! long-horizon fallback that re-dials forever at a fixed interval once the
//! transport gives up entirely.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatline_protocol::ChatMessage;

use crate::transport::HubConnection;
use crate::types::{ClientEvent, ConnectionState, RetryConfig};

/// Shared state behind the client, the dispatcher callbacks, and the retry
/// loop. Held as `Arc<ClientContext>` to avoid threading each field
/// separately.
pub(crate) struct ClientContext {
    pub(crate) connection: Arc<dyn HubConnection>,
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    pub(crate) messages_tx: watch::Sender<Vec<ChatMessage>>,
    pub(crate) users_tx: watch::Sender<Vec<String>>,
    pub(crate) events_tx: mpsc::Sender<ClientEvent>,
    pub(crate) retry: RetryConfig,
    /// Cancel token for the active retry loop, if one is running.
    pub(crate) retry_cancel: std::sync::Mutex<Option<CancellationToken>>,
    /// Set once by `stop()`; suppresses all further reconnection.
    pub(crate) stopped: AtomicBool,
}

impl ClientContext {
    /// Updates the connection state and emits a [`ClientEvent`].
    ///
    /// Sync so it can be called from transport callbacks as well as async
    /// tasks.
    pub(crate) fn set_state(&self, new_state: ConnectionState) {
        self.state_tx.send_replace(new_state);
        let _ = self.events_tx.try_send(ClientEvent::StateChanged(new_state));
    }
}

/// Cancels the active retry loop, if any.
pub(crate) fn cancel_any_retry(retry_cancel: &std::sync::Mutex<Option<CancellationToken>>) {
    if let Ok(mut guard) = retry_cancel.lock()
        && let Some(token) = guard.take()
    {
        token.cancel();
    }
}

/// Spawns a fresh start loop, cancelling any previous one.
pub(crate) fn spawn_start_loop(ctx: Arc<ClientContext>) {
    cancel_any_retry(&ctx.retry_cancel);
    let cancel = CancellationToken::new();
    if let Ok(mut guard) = ctx.retry_cancel.lock() {
        *guard = Some(cancel.clone());
    }
    tokio::spawn(start_loop(ctx, cancel));
}

/// Drives `start()` until it succeeds, retrying at the configured fixed
/// delay. Unbounded attempt count; the counter resets on success because the
/// loop exits and any later loop starts fresh.
pub(crate) async fn start_loop(ctx: Arc<ClientContext>, cancel: CancellationToken) {
    let mut attempt: u32 = 0;
    loop {
        if ctx.stopped.load(Ordering::Relaxed) || cancel.is_cancelled() {
            return;
        }

        ctx.set_state(ConnectionState::Connecting);
        match ctx.connection.start().await {
            Ok(()) => {
                // A stop that landed while this attempt was in flight is
                // final; tear the late connection down instead of
                // publishing it.
                if ctx.stopped.load(Ordering::Relaxed) || cancel.is_cancelled() {
                    if let Err(e) = ctx.connection.stop().await {
                        warn!(error = %e, "error stopping connection opened after cancel");
                    }
                    return;
                }
                ctx.set_state(ConnectionState::Connected);
                info!("hub connection established");
                return;
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);
                warn!(error = %e, attempt, "failed to start hub connection");
                ctx.set_state(ConnectionState::Disconnected);

                let delay = ctx.retry.delay;
                let _ = ctx
                    .events_tx
                    .try_send(ClientEvent::RetryScheduled { attempt, delay });

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_any_retry_clears_token() {
        let retry_cancel = std::sync::Mutex::new(None);
        let token = CancellationToken::new();
        *retry_cancel.lock().unwrap() = Some(token.clone());

        cancel_any_retry(&retry_cancel);

        assert!(retry_cancel.lock().unwrap().is_none());
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_any_retry_without_token_is_noop() {
        let retry_cancel = std::sync::Mutex::new(None);
        cancel_any_retry(&retry_cancel);
        assert!(retry_cancel.lock().unwrap().is_none());
    }
}
