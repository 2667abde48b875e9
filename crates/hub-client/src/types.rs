//! Public types for the chat hub client.

use std::time::Duration;

/// Default hub endpoint when none is configured.
pub const DEFAULT_HUB_URL: &str = "http://localhost:5000/chat";

/// Connection state of the hub channel.
///
/// Single source of truth, owned by the client's lifecycle manager and read
/// by the action gateway before every outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No active connection. Initial state, and the state between failed
    /// start attempts.
    Disconnected,
    /// A start attempt is in flight.
    Connecting,
    /// Connected to the hub; invocations are eligible.
    Connected,
    /// Connection lost; the transport is running its own short-horizon
    /// reconnect attempts.
    Reconnecting,
}

/// Events emitted by the client for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// A start attempt failed and a retry was scheduled.
    RetryScheduled { attempt: u32, delay: Duration },
}

/// Configuration for the application-level retry loop.
///
/// Deliberately a fixed delay: no cap on attempts, no backoff growth, no
/// jitter. The transport's own bounded reconnection handles short blips;
/// this loop guarantees eventual recovery from prolonged outages.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay between failed start attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
        }
    }
}

/// Client configuration: hub endpoint and retry policy.
///
/// The URL is consumed by the transport when it is constructed; the retry
/// policy by [`ChatClient::connect`](crate::ChatClient::connect).
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub hub_url: String,
    pub retry: RetryConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}
