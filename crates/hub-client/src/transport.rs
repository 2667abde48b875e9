//! Transport seam: the opaque hub connection capability.
//!
//! The client never dials sockets itself. It drives a [`HubConnection`]
//! trait object, which keeps lifecycle logic decoupled from the wire and
//! testable with scripted fakes.

use std::future::Future;
use std::pin::Pin;

use chatline_protocol::{Invocation, ServerEvent};

/// Errors reported by a hub connection.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection closed")]
    Closed,

    #[error("invocation failed: {0}")]
    Invoke(String),

    #[error("invocation timed out")]
    Timeout,
}

/// Callback for server-pushed events.
pub type EventCallback = Box<dyn Fn(ServerEvent) + Send + Sync>;

/// Callback for a transport lifecycle transition.
pub type LifecycleCallback = Box<dyn Fn() + Send + Sync>;

/// Handler bundle registered on a connection exactly once, before the first
/// start, so no inbound event can race the registration.
pub struct HubCallbacks {
    /// A recognized server event arrived.
    pub on_event: EventCallback,
    /// The transport lost the connection and entered its own bounded
    /// reconnect phase.
    pub on_reconnecting: LifecycleCallback,
    /// The transport recovered the connection on its own.
    pub on_reconnected: LifecycleCallback,
    /// Terminal loss: the transport exhausted its reconnect attempts.
    pub on_close: LifecycleCallback,
}

/// Abstract persistent bidirectional channel to the hub.
///
/// The lifecycle manager is the only component that calls `start`/`stop`;
/// the action gateway only issues `invoke`. Implementations own their own
/// short-horizon automatic reconnection and report it through
/// [`HubCallbacks`].
pub trait HubConnection: Send + Sync {
    /// Registers the handler bundle. Called once, before the first `start`.
    fn set_callbacks(&self, callbacks: HubCallbacks);

    /// Establishes the connection.
    fn start(&self) -> Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + '_>>;

    /// Gracefully shuts the connection down. Best-effort; must not trigger
    /// the reconnect callbacks.
    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + '_>>;

    /// Issues a remote invocation and awaits the hub's acknowledgment.
    fn invoke(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + '_>>;
}
