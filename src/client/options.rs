use crate::infrastructure::ReconnectPolicy;
use crate::types::constants::{
    BACKOFF_BASE, BACKOFF_CAP, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, HISTORY_SIZE,
    KEEPALIVE_INTERVAL, LISTENER_BUFFER, MAX_RETRIES, WS_PATH,
};
use crate::types::{RealtimeError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Deployment mode; picks the websocket scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Development => "ws",
            Self::Production => "wss",
        }
    }
}

impl FromStr for Environment {
    type Err = RealtimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(RealtimeError::Config(format!("unknown environment '{other}'"))),
        }
    }
}

/// Hub configuration.
///
/// Timings are stored in milliseconds so the struct deserializes from plain
/// JSON/TOML; use the `Duration` accessors in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubOptions {
    /// Realtime service `host[:port]`
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default = "default_path")]
    pub path: String,

    /// Full URL; overrides host/environment/path when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,

    /// Treat an unanswered ping as a dead connection
    #[serde(default)]
    pub keepalive_reply_timeout: bool,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_listener_buffer")]
    pub listener_buffer: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_path() -> String {
    WS_PATH.to_string()
}

fn default_backoff_base_ms() -> u64 {
    BACKOFF_BASE
}

fn default_backoff_cap_ms() -> u64 {
    BACKOFF_CAP
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_keepalive_interval_ms() -> u64 {
    KEEPALIVE_INTERVAL
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_history_size() -> usize {
    HISTORY_SIZE
}

fn default_listener_buffer() -> usize {
    LISTENER_BUFFER
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            environment: Environment::default(),
            path: default_path(),
            endpoint: None,
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            max_retries: default_max_retries(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            keepalive_reply_timeout: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            history_size: default_history_size(),
            listener_buffer: default_listener_buffer(),
        }
    }
}

impl HubOptions {
    /// Reads `CLEARPATH_WS_HOST`, `CLEARPATH_ENV`, `CLEARPATH_WS_ENDPOINT` and
    /// `CLEARPATH_WS_MAX_RETRIES`, falling back to defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Config`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(host) = lookup("CLEARPATH_WS_HOST") {
            options.host = host;
        }
        if let Some(env) = lookup("CLEARPATH_ENV") {
            options.environment = env.parse()?;
        }
        if let Some(endpoint) = lookup("CLEARPATH_WS_ENDPOINT") {
            options.endpoint = Some(endpoint);
        }
        if let Some(retries) = lookup("CLEARPATH_WS_MAX_RETRIES") {
            options.max_retries = retries.trim().parse().map_err(|e| {
                RealtimeError::Config(format!("CLEARPATH_WS_MAX_RETRIES='{retries}': {e}"))
            })?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Checks values the hub cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Config`] for a zero keepalive interval or
    /// backoff base.
    pub fn validate(&self) -> Result<()> {
        if self.keepalive_interval_ms == 0 {
            return Err(RealtimeError::Config(
                "keepalive_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.backoff_base_ms == 0 {
            return Err(RealtimeError::Config(
                "backoff_base_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base_ms = base.as_millis() as u64;
        self.backoff_cap_ms = cap.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_keepalive(mut self, interval: Duration, enforce_reply: bool) -> Self {
        self.keepalive_interval_ms = interval.as_millis() as u64;
        self.keepalive_reply_timeout = enforce_reply;
        self
    }

    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_cap_ms),
            self.max_retries,
        )
    }

    /// Builds the websocket URL
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::UrlParse`] or [`RealtimeError::InvalidEndpoint`]
    /// when the result is not a `ws`/`wss` URL with a host.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "{}://{}{}",
                self.environment.scheme(),
                self.host.trim_end_matches('/'),
                self.path
            ),
        };

        let url = Url::parse(&raw)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidEndpoint(format!(
                "expected ws:// or wss://, got '{raw}'"
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(RealtimeError::InvalidEndpoint(format!("missing host in '{raw}'")));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_options_defaults() {
        let options = HubOptions::default();

        assert_eq!(options.host, "localhost:8001");
        assert_eq!(options.environment, Environment::Development);
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.keepalive_interval(), Duration::from_secs(30));
        assert_eq!(options.history_size, 10);
        assert!(!options.keepalive_reply_timeout);
    }

    #[test]
    fn test_endpoint_scheme_follows_environment() {
        let dev = HubOptions::default().with_host("realtime.internal:8001");
        assert_eq!(
            dev.endpoint_url().unwrap().as_str(),
            "ws://realtime.internal:8001/ws/connect"
        );

        let prod = HubOptions::default()
            .with_host("realtime.clearpath.ai")
            .with_environment(Environment::Production);
        assert_eq!(
            prod.endpoint_url().unwrap().as_str(),
            "wss://realtime.clearpath.ai/ws/connect"
        );
    }

    #[test]
    fn test_endpoint_override_wins() {
        let options = HubOptions::default()
            .with_environment(Environment::Production)
            .with_endpoint("ws://127.0.0.1:9000/ws/dashboard");
        assert_eq!(
            options.endpoint_url().unwrap().as_str(),
            "ws://127.0.0.1:9000/ws/dashboard"
        );
    }

    #[test]
    fn test_invalid_endpoints() {
        let http = HubOptions::default().with_endpoint("http://localhost:8001/ws/connect");
        assert!(matches!(
            http.endpoint_url(),
            Err(RealtimeError::InvalidEndpoint(_))
        ));

        let garbage = HubOptions::default().with_endpoint("::::");
        assert!(matches!(garbage.endpoint_url(), Err(RealtimeError::UrlParse(_))));
    }

    #[test]
    fn test_reconnect_policy_from_options() {
        let options = HubOptions::default()
            .with_backoff(Duration::from_millis(500), Duration::from_secs(4))
            .with_max_retries(3);
        let policy = options.reconnect_policy();

        assert_eq!(policy.base, Duration::from_millis(500));
        assert_eq!(policy.cap, Duration::from_secs(4));
        assert_eq!(policy.max_retries, 3);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CLEARPATH_WS_HOST", "rt.example.com"),
            ("CLEARPATH_ENV", "production"),
            ("CLEARPATH_WS_MAX_RETRIES", "8"),
        ]);
        let options =
            HubOptions::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(options.host, "rt.example.com");
        assert_eq!(options.environment, Environment::Production);
        assert_eq!(options.max_retries, 8);
        assert!(options.endpoint.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let bad_env = HubOptions::from_lookup(|key| {
            (key == "CLEARPATH_ENV").then(|| "staging".to_string())
        });
        assert!(matches!(bad_env, Err(RealtimeError::Config(_))));

        let bad_retries = HubOptions::from_lookup(|key| {
            (key == "CLEARPATH_WS_MAX_RETRIES").then(|| "many".to_string())
        });
        assert!(matches!(bad_retries, Err(RealtimeError::Config(_))));
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        assert!(HubOptions::default().validate().is_ok());

        let no_keepalive = HubOptions::default().with_keepalive(Duration::ZERO, false);
        assert!(matches!(
            no_keepalive.validate(),
            Err(RealtimeError::Config(_))
        ));

        let no_backoff = HubOptions::default().with_backoff(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(no_backoff.validate(), Err(RealtimeError::Config(_))));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: HubOptions = serde_json::from_str(
            r#"{"host": "rt:8001", "environment": "production", "max_retries": 2}"#,
        )
        .unwrap();

        assert_eq!(options.host, "rt:8001");
        assert_eq!(options.environment, Environment::Production);
        assert_eq!(options.max_retries, 2);
        assert_eq!(options.backoff_base_ms, 1_000);
        assert_eq!(options.path, "/ws/connect");
    }
}
