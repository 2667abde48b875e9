//! Resilient chat hub client.
//!
//! Owns the connection lifecycle (start, stop, application-level retry),
//! dispatches server-pushed events into two observable state streams
//! (message log and connected-user roster), and gates outbound invocations
//! on the current connection state.
//!
//! The transport itself is consumed as an opaque [`HubConnection`] trait
//! object; see `chatline-ws-transport` for the WebSocket implementation.

mod actions;
pub mod client;
mod dispatcher;
pub mod error;
mod lifecycle;
pub mod transport;
pub mod types;

pub use client::ChatClient;
pub use error::ClientError;
pub use transport::{EventCallback, HubCallbacks, HubConnection, HubError, LifecycleCallback};
pub use types::{ChatConfig, ClientEvent, ConnectionState, DEFAULT_HUB_URL, RetryConfig};
