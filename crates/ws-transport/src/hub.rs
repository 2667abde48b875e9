//! WebSocket hub connection.
//!
//! Owns the socket lifecycle: dialing, pump tasks, invocation correlation,
//! and the bounded transport-level reconnect schedule.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use chatline_hub_client::{HubCallbacks, HubConnection, HubError};
use chatline_protocol::Invocation;

use crate::pumps;

pub(crate) const MAX_MESSAGE_SIZE: usize = 1 << 20;
pub(crate) const PING_PERIOD: Duration = Duration::from_secs(15);
pub(crate) const PONG_WAIT: Duration = Duration::from_secs(45);
const INVOKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Callbacks as shared by the pumps. `None` until the client registers.
pub(crate) type SharedCallbacks = Arc<StdMutex<Option<Arc<HubCallbacks>>>>;

/// In-flight invocations awaiting acknowledgment, keyed by correlation id.
pub(crate) type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<(), String>>>>>;

/// Bounded schedule for transport-level automatic reconnection.
///
/// One attempt per entry; when the schedule is exhausted the transport
/// reports a terminal close. The application-level fixed-delay retry loop
/// handles everything beyond that.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub delays: Vec<Duration>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(10),
                Duration::from_secs(30),
            ],
        }
    }
}

/// Handles to the currently open socket.
struct Active {
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
}

/// Shared state passed to the reconnect task and disconnect handler.
#[derive(Clone)]
struct HubContext {
    url: String,
    policy: ReconnectPolicy,
    callbacks: SharedCallbacks,
    active: Arc<Mutex<Option<Active>>>,
    pending: PendingMap,
    /// Set by `stop()`; suppresses reconnection and close reporting.
    closed: Arc<AtomicBool>,
}

/// WebSocket-backed hub connection.
pub struct WsHub {
    ctx: HubContext,
}

impl WsHub {
    /// Creates a hub connection for the given endpoint with the default
    /// reconnect schedule. `http`/`https` URLs are rewritten to `ws`/`wss`.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_policy(url, ReconnectPolicy::default())
    }

    /// Creates a hub connection with a custom reconnect schedule.
    pub fn with_policy(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            ctx: HubContext {
                url: websocket_url(&url.into()),
                policy,
                callbacks: Arc::new(StdMutex::new(None)),
                active: Arc::new(Mutex::new(None)),
                pending: Arc::new(Mutex::new(HashMap::new())),
                closed: Arc::new(AtomicBool::new(false)),
            },
        }
    }
}

impl HubConnection for WsHub {
    fn set_callbacks(&self, callbacks: HubCallbacks) {
        if let Ok(mut guard) = self.ctx.callbacks.lock() {
            *guard = Some(Arc::new(callbacks));
        }
    }

    fn start(
        &self,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + '_>> {
        Box::pin(async move {
            self.ctx.closed.store(false, Ordering::Relaxed);
            if let Some(old) = self.ctx.active.lock().await.take() {
                old.cancel.cancel();
            }

            let active = open_socket(&self.ctx).await?;
            *self.ctx.active.lock().await = Some(active);
            info!(url = %self.ctx.url, "hub socket connected");
            Ok(())
        })
    }

    fn stop(&self) -> std::pin::Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + '_>> {
        Box::pin(async move {
            self.ctx.closed.store(true, Ordering::Relaxed);
            self.ctx.pending.lock().await.clear();

            if let Some(active) = self.ctx.active.lock().await.take() {
                active.cancel.cancel();
                let _ = active
                    .write_tx
                    .send(tungstenite::Message::Close(None))
                    .await;
                debug!("hub socket shut down");
            }
            Ok(())
        })
    }

    fn invoke(
        &self,
        invocation: Invocation,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + '_>> {
        Box::pin(async move {
            let write_tx = {
                let guard = self.ctx.active.lock().await;
                guard
                    .as_ref()
                    .map(|a| a.write_tx.clone())
                    .ok_or(HubError::Closed)?
            };

            let id = uuid::Uuid::new_v4().to_string();
            let target = invocation.target();
            let envelope = invocation
                .into_envelope(id.clone())
                .map_err(|e| HubError::Invoke(e.to_string()))?;
            let json =
                serde_json::to_string(&envelope).map_err(|e| HubError::Invoke(e.to_string()))?;

            let (tx, rx) = oneshot::channel();
            self.ctx.pending.lock().await.insert(id.clone(), tx);

            if write_tx
                .send(tungstenite::Message::Text(json.into()))
                .await
                .is_err()
            {
                self.ctx.pending.lock().await.remove(&id);
                return Err(HubError::Closed);
            }

            let result = tokio::time::timeout(INVOKE_TIMEOUT, rx).await;
            self.ctx.pending.lock().await.remove(&id);

            match result {
                Ok(Ok(Ok(()))) => {
                    trace!(%target, "invocation acknowledged");
                    Ok(())
                }
                Ok(Ok(Err(message))) => Err(HubError::Invoke(message)),
                Ok(Err(_)) => Err(HubError::Closed),
                Err(_) => Err(HubError::Timeout),
            }
        })
    }
}

impl Drop for WsHub {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.ctx.active.try_lock()
            && let Some(active) = guard.take()
        {
            active.cancel.cancel();
        }
    }
}

/// Dials the endpoint and spawns the pump tasks for the new socket.
async fn open_socket(ctx: &HubContext) -> Result<Active, HubError> {
    let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
    ws_config.max_message_size = Some(MAX_MESSAGE_SIZE);
    ws_config.max_frame_size = Some(MAX_MESSAGE_SIZE);

    let (stream, _) =
        tokio_tungstenite::connect_async_with_config(ctx.url.as_str(), Some(ws_config), false)
            .await
            .map_err(|e| HubError::Connect(e.to_string()))?;
    let (write, read) = stream.split();

    let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
    let cancel = CancellationToken::new();

    tokio::spawn(pumps::write::write_pump(write, write_rx, cancel.clone()));
    tokio::spawn(pumps::read::read_pump(
        read,
        ctx.pending.clone(),
        ctx.callbacks.clone(),
        write_tx.clone(),
        cancel.clone(),
        disconnect_handler(ctx.clone()),
    ));

    Ok(Active { write_tx, cancel })
}

/// Builds the hook the read pump fires when the socket dies.
fn disconnect_handler(ctx: HubContext) -> Box<dyn Fn() + Send + Sync> {
    Box::new(move || {
        if ctx.closed.load(Ordering::Relaxed) {
            debug!("socket closed after stop");
            return;
        }
        warn!("socket lost, starting transport reconnect");
        tokio::spawn(auto_reconnect(ctx.clone()));
    })
}

/// Runs the bounded reconnect schedule after an unexpected socket loss.
async fn auto_reconnect(ctx: HubContext) {
    // Tear down the dead socket and fail any in-flight invocations.
    if let Some(old) = ctx.active.lock().await.take() {
        old.cancel.cancel();
    }
    ctx.pending.lock().await.clear();

    fire(&ctx.callbacks, |cb| (cb.on_reconnecting)());

    for (attempt, delay) in ctx.policy.delays.iter().enumerate() {
        tokio::time::sleep(*delay).await;
        if ctx.closed.load(Ordering::Relaxed) {
            return;
        }

        match open_socket(&ctx).await {
            Ok(active) => {
                *ctx.active.lock().await = Some(active);
                info!(attempt = attempt + 1, "transport reconnected");
                fire(&ctx.callbacks, |cb| (cb.on_reconnected)());
                return;
            }
            Err(e) => {
                warn!(attempt = attempt + 1, error = %e, "transport reconnect attempt failed");
            }
        }
    }

    info!("transport reconnect schedule exhausted");
    fire(&ctx.callbacks, |cb| (cb.on_close)());
}

/// Invokes a callback if the client has registered one.
pub(crate) fn fire(callbacks: &SharedCallbacks, f: impl FnOnce(&HubCallbacks)) {
    let cb = callbacks.lock().ok().and_then(|guard| guard.clone());
    match cb {
        Some(cb) => f(&cb),
        None => warn!("no callbacks registered"),
    }
}

/// Rewrites http(s) endpoints to their WebSocket scheme.
fn websocket_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_policy_default_schedule() {
        let policy = ReconnectPolicy::default();
        assert_eq!(
            policy.delays,
            vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(10),
                Duration::from_secs(30),
            ]
        );
    }

    #[test]
    fn http_urls_are_rewritten_to_ws() {
        assert_eq!(
            websocket_url("http://localhost:5000/chat"),
            "ws://localhost:5000/chat"
        );
        assert_eq!(
            websocket_url("https://example.com/chat"),
            "wss://example.com/chat"
        );
        assert_eq!(
            websocket_url("ws://localhost:5000/chat"),
            "ws://localhost:5000/chat"
        );
    }

    #[tokio::test]
    async fn invoke_without_connection_fails() {
        let hub = WsHub::new("http://localhost:5000/chat");
        let result = hub.invoke(Invocation::SendMessage("hi".into())).await;
        assert!(matches!(result, Err(HubError::Closed)));
    }

    #[tokio::test]
    async fn stop_without_connection_is_noop() {
        let hub = WsHub::new("http://localhost:5000/chat");
        hub.stop().await.unwrap();
        hub.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_with_invalid_url_is_a_connect_error() {
        let hub = WsHub::new("not a url");
        let result = hub.start().await;
        assert!(matches!(result, Err(HubError::Connect(_))));
    }
}
