use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::constants::frame_types;
use crate::messaging::MessageType;

/// Frame sent from the hub to the server: `{ "type": ..., "data": {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl OutboundFrame {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn subscribe(topic: &str) -> Self {
        Self::new(frame_types::SUBSCRIBE, json!({ "subscription_type": topic }))
    }

    pub fn unsubscribe(topic: &str) -> Self {
        Self::new(
            frame_types::UNSUBSCRIBE,
            json!({ "subscription_type": topic }),
        )
    }

    pub fn ping(timestamp: impl Into<String>) -> Self {
        Self::new(frame_types::PING, json!({ "timestamp": timestamp.into() }))
    }

    pub fn connection_info_request() -> Self {
        Self::new(frame_types::GET_CONNECTION_INFO, json!({}))
    }

    /// Topic carried by a subscribe/unsubscribe frame
    pub fn subscription_type(&self) -> Option<&str> {
        self.data.get("subscription_type").and_then(Value::as_str)
    }
}

/// Frame received from the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn new(kind: impl Into<MessageType>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: String::new(),
            message_id: None,
        }
    }

    /// Connection id carried by a handshake (`success`) frame
    pub fn connection_id(&self) -> Option<&str> {
        if self.kind != MessageType::Success {
            return None;
        }
        self.data.get("connection_id").and_then(Value::as_str)
    }
}

/// Server-side view of this connection, returned by `get_connection_info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub connected_at: Option<String>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_shape() {
        let frame = OutboundFrame::subscribe("package_updates");
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "subscribe");
        assert_eq!(json["data"]["subscription_type"], "package_updates");
        assert_eq!(frame.subscription_type(), Some("package_updates"));
    }

    #[test]
    fn test_ping_frame_carries_timestamp() {
        let frame = OutboundFrame::ping("2025-01-01T00:00:00Z");
        assert_eq!(frame.kind, "ping");
        assert_eq!(frame.data["timestamp"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn test_inbound_message_parses_server_frame() {
        let raw = r#"{
            "type": "package_update",
            "data": {"package_id": "PKG1", "status": "in_transit"},
            "timestamp": "2025-03-01T10:00:00.123456",
            "message_id": "m-1"
        }"#;

        let message: InboundMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.kind, MessageType::PackageUpdate);
        assert_eq!(message.data["package_id"], "PKG1");
        assert_eq!(message.timestamp, "2025-03-01T10:00:00.123456");
        assert_eq!(message.message_id.as_deref(), Some("m-1"));
    }

    #[test]
    fn test_inbound_message_without_optional_fields() {
        let message: InboundMessage = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert_eq!(message.kind, MessageType::Pong);
        assert_eq!(message.data, Value::Null);
        assert!(message.message_id.is_none());

        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("message_id"));
    }

    #[test]
    fn test_inbound_message_requires_type() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"data": {}}"#).is_err());
        assert!(serde_json::from_str::<InboundMessage>("not json").is_err());
    }

    #[test]
    fn test_handshake_connection_id() {
        let hello = InboundMessage::new(
            "success",
            json!({"message": "Connected", "connection_id": "abc-123"}),
        );
        assert_eq!(hello.connection_id(), Some("abc-123"));

        let other = InboundMessage::new("package_update", json!({"connection_id": "nope"}));
        assert_eq!(other.connection_id(), None);
    }

    #[test]
    fn test_connection_info_from_reply() {
        let data = json!({
            "connection_id": "abc",
            "user_id": null,
            "connected_at": "2025-03-01T10:00:00",
            "last_activity": "2025-03-01T10:05:00",
            "subscriptions": ["package_updates", "notifications"]
        });
        let info: ConnectionInfo = serde_json::from_value(data).unwrap();
        assert_eq!(info.connection_id, "abc");
        assert_eq!(info.subscriptions, vec!["package_updates", "notifications"]);
    }
}
