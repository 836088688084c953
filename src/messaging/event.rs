use crate::types::constants::{frame_types, message_types};
use serde::{Deserialize, Serialize};

/// Type-safe inbound message kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    PackageUpdate,
    AnomalyDetected,
    RecoverySuggestion,
    DashboardMetrics,
    AgentActivity,
    Notification,
    MapUpdate,
    SystemHealth,
    Ping,
    Pong,
    Error,
    /// Handshake and request acknowledgements
    Success,
    /// Any type tag this crate does not know about
    Custom(String),
}

impl MessageType {
    /// Parse a string into a MessageType
    pub fn parse(s: &str) -> Self {
        match s {
            message_types::PACKAGE_UPDATE => Self::PackageUpdate,
            message_types::ANOMALY_DETECTED => Self::AnomalyDetected,
            message_types::RECOVERY_SUGGESTION => Self::RecoverySuggestion,
            message_types::DASHBOARD_METRICS => Self::DashboardMetrics,
            message_types::AGENT_ACTIVITY => Self::AgentActivity,
            message_types::NOTIFICATION => Self::Notification,
            message_types::MAP_UPDATE => Self::MapUpdate,
            message_types::SYSTEM_HEALTH => Self::SystemHealth,
            frame_types::PING => Self::Ping,
            frame_types::PONG => Self::Pong,
            frame_types::ERROR => Self::Error,
            frame_types::SUCCESS => Self::Success,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Convert to the wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::PackageUpdate => message_types::PACKAGE_UPDATE,
            Self::AnomalyDetected => message_types::ANOMALY_DETECTED,
            Self::RecoverySuggestion => message_types::RECOVERY_SUGGESTION,
            Self::DashboardMetrics => message_types::DASHBOARD_METRICS,
            Self::AgentActivity => message_types::AGENT_ACTIVITY,
            Self::Notification => message_types::NOTIFICATION,
            Self::MapUpdate => message_types::MAP_UPDATE,
            Self::SystemHealth => message_types::SYSTEM_HEALTH,
            Self::Ping => frame_types::PING,
            Self::Pong => frame_types::PONG,
            Self::Error => frame_types::ERROR,
            Self::Success => frame_types::SUCCESS,
            Self::Custom(s) => s,
        }
    }

    /// Control traffic that dashboards normally ignore
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Ping | Self::Pong | Self::Success | Self::Error)
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for MessageType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_parse() {
        assert_eq!(MessageType::parse("package_update"), MessageType::PackageUpdate);
        assert_eq!(MessageType::parse("anomaly_detected"), MessageType::AnomalyDetected);
        assert_eq!(MessageType::parse("success"), MessageType::Success);
        assert_eq!(
            MessageType::parse("test_message"),
            MessageType::Custom("test_message".to_string())
        );
    }

    #[test]
    fn test_message_type_wire_format() {
        let json = serde_json::to_string(&MessageType::MapUpdate).unwrap();
        assert_eq!(json, r#""map_update""#);

        let custom: MessageType = serde_json::from_str(r#""shipment_rerouted""#).unwrap();
        assert_eq!(custom, MessageType::Custom("shipment_rerouted".to_string()));
        assert_eq!(serde_json::to_string(&custom).unwrap(), r#""shipment_rerouted""#);
    }

    #[test]
    fn test_control_types() {
        assert!(MessageType::Pong.is_control());
        assert!(MessageType::Success.is_control());
        assert!(!MessageType::DashboardMetrics.is_control());
    }
}
