//! WebSocket implementation of the chatline hub connection.
//!
//! Exchanges JSON envelopes over a single socket, with read/write pumps,
//! invocation acknowledgment by correlation id, and a bounded automatic
//! reconnection schedule. When the schedule is exhausted the
//! transport reports a terminal close and the client's own retry loop takes
//! over.

use std::sync::Arc;

use chatline_hub_client::{ChatClient, ChatConfig};

pub mod hub;
pub(crate) mod pumps;

pub use hub::{ReconnectPolicy, WsHub};

/// Connects a chat client to the configured hub over WebSocket.
///
/// Connection establishment begins immediately; subscribe to
/// [`ChatClient::watch_state`] to observe progress. Must be called within a
/// tokio runtime.
pub fn connect(config: ChatConfig) -> ChatClient {
    let hub = Arc::new(WsHub::new(config.hub_url));
    ChatClient::connect(hub, config.retry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_builds_a_client_from_config() {
        let client = connect(ChatConfig::default());
        assert!(client.messages().borrow().is_empty());
        assert!(client.connected_users().borrow().is_empty());
        client.stop().await;
    }
}
