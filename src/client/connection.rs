use serde::{Deserialize, Serialize};

/// Lifecycle of the hub's single connection.
///
/// `Closed` may go back to `Connecting` (reconnect or a new `start()`).
/// `Failed` is terminal for automatic recovery: only an explicit `start()`
/// leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// No automatic attempt will happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Open => "Open",
            Self::Closing => "Closing",
            Self::Closed => "Closed",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_checks() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Connecting.is_open());

        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Closed.is_terminal());
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "Open");
        assert_eq!(ConnectionState::Failed.to_string(), "Failed");
    }
}
