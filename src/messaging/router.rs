use super::MessageType;
use crate::types::{ConnectionInfo, InboundMessage, RealtimeError};
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// What the router did with one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Frame could not be parsed and was dropped
    Malformed(RealtimeError),
    /// Handshake identity response; not dispatched
    Handshake {
        connection_id: String,
        info: Option<ConnectionInfo>,
    },
    /// Frame was handed to every listener and stored as the last message
    Dispatched(MessageType),
}

/// Parses inbound frames and fans them out to listeners.
///
/// The router performs no topic filtering: the server-side subscription decides
/// what this connection receives and listeners filter on `type` themselves.
pub struct MessageRouter {
    listeners: Vec<mpsc::Sender<InboundMessage>>,
    last_message: Option<InboundMessage>,
    history: VecDeque<InboundMessage>,
    history_size: usize,
}

impl MessageRouter {
    pub fn new(history_size: usize) -> Self {
        Self {
            listeners: Vec::new(),
            last_message: None,
            history: VecDeque::with_capacity(history_size),
            history_size,
        }
    }

    /// Registers a listener. The router keeps only the sending half, so
    /// dropping the receiver unregisters it on the next dispatch.
    pub fn add_listener(&mut self, sender: mpsc::Sender<InboundMessage>) {
        self.listeners.push(sender);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn last_message(&self) -> Option<&InboundMessage> {
        self.last_message.as_ref()
    }

    /// Most recent messages, newest first
    pub fn history(&self) -> impl Iterator<Item = &InboundMessage> {
        self.history.iter()
    }

    /// Routes one raw text frame
    pub fn route(&mut self, raw: &str) -> RouteOutcome {
        let message = match serde_json::from_str::<InboundMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {} - Raw: {}", e, raw);
                return RouteOutcome::Malformed(RealtimeError::MalformedFrame(e.to_string()));
            }
        };

        if let Some(connection_id) = message.connection_id() {
            let connection_id = connection_id.to_string();
            let info = if message.data.get("subscriptions").is_some() {
                serde_json::from_value::<ConnectionInfo>(message.data.clone()).ok()
            } else {
                None
            };
            tracing::debug!("Handshake received, connection_id={}", connection_id);
            return RouteOutcome::Handshake {
                connection_id,
                info,
            };
        }

        let kind = message.kind.clone();
        tracing::debug!(
            "Routing message: type={}, listeners={}",
            kind,
            self.listeners.len()
        );
        self.dispatch(message);
        RouteOutcome::Dispatched(kind)
    }

    fn dispatch(&mut self, message: InboundMessage) {
        self.listeners.retain(|listener| match listener.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    "Listener is full, dropping '{}' message for it",
                    message.kind
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Listener dropped, unregistering");
                false
            }
        });

        if self.history_size > 0 {
            if self.history.len() == self.history_size {
                self.history.pop_back();
            }
            self.history.push_front(message.clone());
        }
        self.last_message = Some(message);
    }

    /// Converts a server `error` frame into an error signal.
    pub fn server_error(message: &InboundMessage) -> Option<RealtimeError> {
        if message.kind != MessageType::Error {
            return None;
        }
        let data = &message.data;
        let text = |key: &str| data.get(key).and_then(|v| v.as_str()).map(str::to_string);

        Some(RealtimeError::Server {
            code: text("error_code").unwrap_or_else(|| "SERVER_ERROR".to_string()),
            message: text("error_message")
                .or_else(|| text("error"))
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(kind: &str, data: serde_json::Value) -> String {
        json!({"type": kind, "data": data, "timestamp": "2025-03-01T10:00:00"}).to_string()
    }

    #[tokio::test]
    async fn test_dispatches_to_every_listener() {
        let mut router = MessageRouter::new(10);
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        router.add_listener(tx1);
        router.add_listener(tx2);

        let outcome = router.route(&frame("package_update", json!({"package_id": "PKG1"})));
        assert_eq!(outcome, RouteOutcome::Dispatched(MessageType::PackageUpdate));

        assert_eq!(rx1.recv().await.unwrap().data["package_id"], "PKG1");
        assert_eq!(rx2.recv().await.unwrap().data["package_id"], "PKG1");
        assert_eq!(
            router.last_message().unwrap().kind,
            MessageType::PackageUpdate
        );
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let mut router = MessageRouter::new(10);
        router.route(&frame("dashboard_metrics", json!({"total_packages": 3})));

        let outcome = router.route("{not json");
        assert!(matches!(
            outcome,
            RouteOutcome::Malformed(RealtimeError::MalformedFrame(_))
        ));
        assert_eq!(
            router.last_message().unwrap().kind,
            MessageType::DashboardMetrics
        );
        assert_eq!(router.history().count(), 1);
    }

    #[test]
    fn test_handshake_is_not_dispatched() {
        let mut router = MessageRouter::new(10);
        let (tx, mut rx) = mpsc::channel(8);
        router.add_listener(tx);

        let outcome = router.route(&frame(
            "success",
            json!({"message": "Connected", "connection_id": "conn-1"}),
        ));

        assert_eq!(
            outcome,
            RouteOutcome::Handshake {
                connection_id: "conn-1".to_string(),
                info: None
            }
        );
        assert!(router.last_message().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_connection_info_reply() {
        let mut router = MessageRouter::new(10);
        let outcome = router.route(&frame(
            "success",
            json!({
                "connection_id": "conn-1",
                "connected_at": "2025-03-01T10:00:00",
                "last_activity": "2025-03-01T10:00:05",
                "subscriptions": ["package_updates"]
            }),
        ));

        let RouteOutcome::Handshake { info, .. } = outcome else {
            panic!("expected handshake");
        };
        assert_eq!(info.unwrap().subscriptions, vec!["package_updates"]);
    }

    #[test]
    fn test_dropped_listener_is_unregistered() {
        let mut router = MessageRouter::new(10);
        let (tx, rx) = mpsc::channel(8);
        router.add_listener(tx);
        drop(rx);

        router.route(&frame("notification", json!({"title": "hi"})));
        assert_eq!(router.listener_count(), 0);
    }

    #[test]
    fn test_full_listener_is_kept() {
        let mut router = MessageRouter::new(10);
        let (tx, mut rx) = mpsc::channel(1);
        router.add_listener(tx);

        router.route(&frame("map_update", json!({"package_id": "A"})));
        router.route(&frame("map_update", json!({"package_id": "B"})));

        assert_eq!(router.listener_count(), 1);
        assert_eq!(rx.try_recv().unwrap().data["package_id"], "A");
        assert!(rx.try_recv().is_err());
        assert_eq!(router.last_message().unwrap().data["package_id"], "B");
    }

    #[test]
    fn test_history_is_bounded() {
        let mut router = MessageRouter::new(3);
        for i in 0..5 {
            router.route(&frame("agent_activity", json!({ "seq": i })));
        }

        let seqs: Vec<i64> = router
            .history()
            .map(|m| m.data["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, vec![4, 3, 2]);
    }

    #[test]
    fn test_server_error_frame() {
        let message = InboundMessage::new(
            "error",
            json!({"error_code": "MESSAGE_HANDLING_ERROR", "error_message": "boom"}),
        );
        assert_eq!(
            MessageRouter::server_error(&message),
            Some(RealtimeError::Server {
                code: "MESSAGE_HANDLING_ERROR".to_string(),
                message: "boom".to_string()
            })
        );

        let plain = InboundMessage::new("error", json!({"error": "Invalid JSON format"}));
        let Some(RealtimeError::Server { message, .. }) = MessageRouter::server_error(&plain)
        else {
            panic!("expected server error");
        };
        assert_eq!(message, "Invalid JSON format");

        let update = InboundMessage::new("package_update", json!({}));
        assert!(MessageRouter::server_error(&update).is_none());
    }
}
