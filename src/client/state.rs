use super::connection::ConnectionState;
use crate::types::{ConnectionInfo, InboundMessage, RealtimeError};

/// Consumer-visible view of the hub, published through a `watch` channel.
///
/// Only the driver task writes it; every [`RealtimeHub`](super::RealtimeHub)
/// clone reads the latest value without locking.
#[derive(Debug, Clone, Default)]
pub struct HubSnapshot {
    pub state: ConnectionState,

    /// Assigned by the server handshake, cleared whenever the link closes
    pub connection_id: Option<String>,

    /// Last reply to `get_connection_info`
    pub connection_info: Option<ConnectionInfo>,

    /// Reconnect attempts since the last successful open
    pub retry_count: u32,

    pub last_error: Option<RealtimeError>,

    /// Overwritten on every dispatch; not a queue
    pub last_message: Option<InboundMessage>,

    /// Bounded history, newest first
    pub recent_messages: Vec<InboundMessage>,

    /// Desired topics, in insertion order
    pub subscriptions: Vec<String>,
}

impl HubSnapshot {
    pub fn is_connected(&self) -> bool {
        self.state.is_open()
    }
}
