//! Socket read pump — routes acknowledgments and dispatches server events.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use chatline_protocol::{Envelope, ServerEvent};

use crate::hub::{PONG_WAIT, PendingMap, SharedCallbacks};

/// Reads frames from the socket and dispatches them.
///
/// Uses a pong deadline to detect dead connections: any incoming frame
/// resets the timer; if nothing arrives within [`PONG_WAIT`] the connection
/// is considered dead and the pump exits, firing the disconnect hook.
pub(crate) async fn read_pump<S>(
    mut read: S,
    pending: PendingMap,
    callbacks: SharedCallbacks,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
    on_disconnect: Box<dyn Fn() + Send + Sync>,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let pong_deadline = tokio::time::sleep(PONG_WAIT);
    tokio::pin!(pong_deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut pong_deadline => {
                warn!("pong timeout, connection dead");
                break;
            }

            frame = read.next() => {
                match frame {
                    Some(Ok(frame)) => {
                        pong_deadline
                            .as_mut()
                            .reset(tokio::time::Instant::now() + PONG_WAIT);

                        match frame {
                            tungstenite::Message::Text(text) => {
                                handle_text(&text, &pending, &callbacks).await;
                            }
                            tungstenite::Message::Ping(data) => {
                                trace!("received ping, sending pong");
                                let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                            }
                            tungstenite::Message::Pong(_) => {
                                trace!("received pong");
                            }
                            tungstenite::Message::Close(_) => {
                                debug!("received close frame");
                                break;
                            }
                            _ => {} // Binary frames are not part of the protocol.
                        }
                    }
                    Some(Err(e)) => {
                        warn!("socket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("socket stream ended");
                        break;
                    }
                }
            }
        }
    }

    on_disconnect();
}

/// Handles one text frame: acknowledgment routing first, then the typed
/// event table.
async fn handle_text(text: &str, pending: &PendingMap, callbacks: &SharedCallbacks) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            warn!("failed to parse envelope: {e}");
            return;
        }
    };

    if let Some(id) = &envelope.id {
        let mut map = pending.lock().await;
        if let Some(tx) = map.remove(id) {
            let result = match envelope.error {
                Some(message) => Err(message),
                None => Ok(()),
            };
            let _ = tx.send(result);
            return;
        }
    }

    match ServerEvent::from_envelope(&envelope) {
        Ok(Some(event)) => crate::hub::fire(callbacks, |cb| (cb.on_event)(event)),
        Ok(None) => trace!(target = %envelope.target, "ignoring unrecognized event"),
        Err(e) => warn!(error = %e, "dropping malformed event"),
    }
}
