use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors reported by the realtime hub.
///
/// The hub never returns these from consumer operations; they are surfaced
/// through [`HubSnapshot::last_error`](crate::client::HubSnapshot::last_error)
/// and the tracing log. The type is `Clone` so it can live in the watch snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// Endpoint cannot be opened at all (bad scheme, missing host). Terminal.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// URL parsing error (malformed endpoint URL). Terminal.
    #[error("URL parse error: {0}")]
    UrlParse(String),

    /// Transport could not be established or failed mid-flight. Recoverable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection closed with a code other than 1000. Recoverable.
    #[error("Connection closed abnormally: code={code}, reason='{reason}'")]
    AbnormalClose { code: u16, reason: String },

    /// Reconnect ceiling reached, the hub stays in `Failed`.
    #[error("Gave up reconnecting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Attempted to send while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// Inbound frame could not be parsed and was dropped
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Error frame pushed by the server
    #[error("Server error {code}: {message}")]
    Server { code: String, message: String },

    /// JSON serialization error on an outbound frame
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid hub configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RealtimeError {
    /// Whether the reconnection policy may retry after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidEndpoint(_)
                | Self::UrlParse(_)
                | Self::Config(_)
                | Self::RetriesExhausted { .. }
        )
    }
}

impl From<tungstenite::Error> for RealtimeError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Url(e) => Self::InvalidEndpoint(e.to_string()),
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RealtimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for RealtimeError {
    fn from(err: url::ParseError) -> Self {
        Self::UrlParse(err.to_string())
    }
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(RealtimeError::Connection("refused".into()).is_recoverable());
        assert!(
            RealtimeError::AbnormalClose {
                code: 1006,
                reason: String::new()
            }
            .is_recoverable()
        );
        assert!(!RealtimeError::InvalidEndpoint("ftp://x".into()).is_recoverable());
        assert!(!RealtimeError::RetriesExhausted { attempts: 5 }.is_recoverable());
    }

    #[test]
    fn test_url_parse_conversion() {
        let err: RealtimeError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, RealtimeError::UrlParse(_)));
        assert!(!err.is_recoverable());
    }
}
