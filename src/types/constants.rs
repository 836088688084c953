/// Frame `type` strings understood by the websocket service (magic strings layer)
pub mod frame_types {
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const GET_CONNECTION_INFO: &str = "get_connection_info";
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
}

/// Inbound message kinds pushed by the server
pub mod message_types {
    pub const PACKAGE_UPDATE: &str = "package_update";
    pub const ANOMALY_DETECTED: &str = "anomaly_detected";
    pub const RECOVERY_SUGGESTION: &str = "recovery_suggestion";
    pub const DASHBOARD_METRICS: &str = "dashboard_metrics";
    pub const AGENT_ACTIVITY: &str = "agent_activity";
    pub const NOTIFICATION: &str = "notification";
    pub const MAP_UPDATE: &str = "map_update";
    pub const SYSTEM_HEALTH: &str = "system_health";
}

/// Subscription streams offered by the server
pub mod topics {
    pub const PACKAGE_UPDATES: &str = "package_updates";
    pub const DASHBOARD_METRICS: &str = "dashboard_metrics";
    pub const ANOMALIES: &str = "anomalies";
    pub const RECOVERY_SUGGESTIONS: &str = "recovery_suggestions";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const MAP_UPDATES: &str = "map_updates";
    pub const AGENT_ACTIVITY: &str = "agent_activity";
    pub const SYSTEM_HEALTH: &str = "system_health";
}

/// Websocket path on the realtime service
pub const WS_PATH: &str = "/ws/connect";

/// Default realtime service host (development)
pub const DEFAULT_HOST: &str = "localhost:8001";

/// Default connect timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10_000;

/// Default keepalive interval (milliseconds)
pub const KEEPALIVE_INTERVAL: u64 = 30_000;

/// Default reconnect backoff (milliseconds)
pub const BACKOFF_BASE: u64 = 1_000;
pub const BACKOFF_CAP: u64 = 30_000;

/// Default reconnect ceiling
pub const MAX_RETRIES: u32 = 5;

/// Recent messages kept for polling consumers
pub const HISTORY_SIZE: usize = 10;

/// Per-listener channel capacity
pub const LISTENER_BUFFER: usize = 100;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;
pub const WS_CLOSE_KEEPALIVE_TIMEOUT: u16 = 4000;
