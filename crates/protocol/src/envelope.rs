use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::value::RawValue;

use crate::messages::{ChatMessage, JoinRoomRequest};

/// Errors from encoding or decoding wire envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed arguments for {target}")]
    BadArguments {
        target: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Envelope for all hub communication.
///
/// Server-pushed events carry a `target` and positional `arguments` but no
/// `id`. Client invocations carry an `id` for correlation; the hub
/// acknowledges with an envelope reusing that `id`, optionally carrying an
/// `error` string.
///
/// The `arguments` field uses [`RawValue`] to defer deserialization until the
/// target is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Creates a server-event envelope with positional arguments.
    pub fn event<T: Serialize>(target: &str, arguments: &T) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: None,
            target: target.to_string(),
            arguments: Some(to_raw(arguments)?),
            error: None,
        })
    }

    /// Creates a successful acknowledgment for the given invocation id.
    pub fn completion(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            target: String::new(),
            arguments: None,
            error: None,
        }
    }

    /// Creates a failed acknowledgment for the given invocation id.
    pub fn completion_error(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            target: String::new(),
            arguments: None,
            error: Some(error.into()),
        }
    }
}

/// A server-pushed event, decoded from its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A chat message was broadcast to the room.
    ReceiveMessage(ChatMessage),
    /// The full roster of connected users. Always a complete snapshot, never
    /// a delta; the hub is the authority on membership.
    ConnectedUser(Vec<String>),
}

impl ServerEvent {
    /// Decodes an envelope into a typed event.
    ///
    /// Returns `Ok(None)` for unrecognized targets — the hub may push event
    /// names this client does not handle, and those are ignored rather than
    /// treated as errors.
    pub fn from_envelope(envelope: &Envelope) -> Result<Option<Self>, ProtocolError> {
        match envelope.target.as_str() {
            "ReceiveMessage" => {
                let (user, message, message_time): (String, String, String) =
                    parse_arguments(envelope)?;
                Ok(Some(Self::ReceiveMessage(ChatMessage {
                    user,
                    message,
                    message_time,
                })))
            }
            "ConnectedUser" => {
                let (users,): (Vec<String>,) = parse_arguments(envelope)?;
                Ok(Some(Self::ConnectedUser(users)))
            }
            _ => Ok(None),
        }
    }
}

/// A client-to-hub remote invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    JoinRoom(JoinRoomRequest),
    SendMessage(String),
}

impl Invocation {
    /// The remote procedure name on the hub.
    pub fn target(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "JoinRoom",
            Self::SendMessage(_) => "SendMessage",
        }
    }

    /// Encodes this invocation as a wire envelope with the given
    /// correlation id.
    pub fn into_envelope(self, id: impl Into<String>) -> Result<Envelope, ProtocolError> {
        let target = self.target();
        let arguments = match &self {
            Self::JoinRoom(req) => to_raw(&(req,))?,
            Self::SendMessage(message) => to_raw(&(message,))?,
        };
        Ok(Envelope {
            id: Some(id.into()),
            target: target.to_string(),
            arguments: Some(arguments),
            error: None,
        })
    }
}

fn parse_arguments<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ProtocolError> {
    let raw = envelope.arguments.as_deref().map_or("[]", RawValue::get);
    serde_json::from_str(raw).map_err(|source| ProtocolError::BadArguments {
        target: envelope.target.clone(),
        source,
    })
}

fn to_raw<T: Serialize>(value: &T) -> Result<Box<RawValue>, ProtocolError> {
    let json = serde_json::to_string(value)?;
    Ok(RawValue::from_string(json)?)
}
