//! Wire protocol types for chatline client-hub communication.
//!
//! Defines the JSON envelope exchanged over the hub connection and the
//! typed dispatch tables for server-pushed events and client invocations.

pub mod envelope;
pub mod messages;

pub use envelope::{Envelope, Invocation, ProtocolError, ServerEvent};
pub use messages::{ChatMessage, JoinRoomRequest};
