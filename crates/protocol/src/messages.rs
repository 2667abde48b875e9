use serde::{Deserialize, Serialize};

/// A single chat message as pushed by the hub.
///
/// Immutable once created; the client appends these to its message log in
/// receipt order and never mutates or removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub user: String,
    pub message: String,
    /// Server-formatted timestamp. Kept as an opaque string; the hub is the
    /// authority on formatting.
    pub message_time: String,
}

/// Payload for the `JoinRoom` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub user: String,
    pub room: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_uses_wire_field_names() {
        let msg = ChatMessage {
            user: "alice".into(),
            message: "hi".into(),
            message_time: "10:00".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["user"], "alice");
        assert_eq!(json["message"], "hi");
        assert_eq!(json["messageTime"], "10:00");
    }

    #[test]
    fn chat_message_roundtrip() {
        let json = r#"{"user":"bob","message":"yo","messageTime":"10:01"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.user, "bob");
        assert_eq!(msg.message_time, "10:01");
        let back = serde_json::to_string(&msg).unwrap();
        let reparsed: ChatMessage = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, msg);
    }

    #[test]
    fn join_room_request_is_camel_case() {
        let req = JoinRoomRequest {
            user: "alice".into(),
            room: "general".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"user":"alice","room":"general"}"#);
    }
}
