//! Remote action gateway: typed wrappers for outbound invocations.

use tracing::{debug, info, warn};

use chatline_protocol::{Invocation, JoinRoomRequest};

use crate::client::ChatClient;
use crate::error::ClientError;
use crate::types::ConnectionState;

impl ChatClient {
    /// Joins a room.
    ///
    /// Invoked unconditionally, without a local state gate: joining is a
    /// low-frequency action, so a dead connection is left to the transport
    /// to reject. Failures are logged and returned.
    pub async fn join_room(
        &self,
        user: impl Into<String>,
        room: impl Into<String>,
    ) -> Result<(), ClientError> {
        let request = JoinRoomRequest {
            user: user.into(),
            room: room.into(),
        };
        let (user, room) = (request.user.clone(), request.room.clone());

        match self.ctx.connection.invoke(Invocation::JoinRoom(request)).await {
            Ok(()) => {
                info!(%user, %room, "joined room");
                Ok(())
            }
            Err(e) => {
                warn!(%user, %room, error = %e, "failed to join room");
                Err(e.into())
            }
        }
    }

    /// Sends a chat message to the current room.
    ///
    /// Gated on the connection state: sending while not `Connected` is a
    /// guaranteed failure, so it is refused locally without a network round
    /// trip. The message log is only ever updated by the hub echoing the
    /// message back, never optimistically.
    pub async fn send_message(&self, message: impl Into<String>) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Connected {
            warn!("cannot send message, connection is not established");
            return Err(ClientError::NotConnected);
        }

        match self
            .ctx
            .connection
            .invoke(Invocation::SendMessage(message.into()))
            .await
        {
            Ok(()) => {
                debug!("message sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to send message");
                Err(e.into())
            }
        }
    }

    /// Leaves the chat by shutting the connection down.
    ///
    /// Delegates to [`stop`](Self::stop); shutdown failures are logged, not
    /// surfaced.
    pub async fn leave_chat(&self) {
        self.stop().await;
    }
}
