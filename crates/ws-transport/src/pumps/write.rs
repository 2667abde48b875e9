//! Outbound pump: application frames plus the keepalive cadence.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::hub::PING_PERIOD;

/// Owns the sink half of the socket. Serializes application frames from the
/// outbound channel, interleaves a keepalive ping every [`PING_PERIOD`], and
/// says goodbye with a close frame when it winds down. The read pump's pong
/// deadline does the dead-connection detection.
///
/// A failed write abandons the sink immediately, with no close frame: the
/// socket is already broken and the read pump will notice.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut keepalive = tokio::time::interval(PING_PERIOD);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    keepalive.tick().await; // The first tick completes immediately.

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = write_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = keepalive.tick() => tungstenite::Message::Ping(Vec::new().into()),
        };

        if let Err(e) = write.send(frame).await {
            warn!(error = %e, "socket write failed, abandoning sink");
            return;
        }
    }

    debug!("write pump closing socket");
    if write.send(tungstenite::Message::Close(None)).await.is_ok() {
        let _ = write.flush().await;
    }
}
