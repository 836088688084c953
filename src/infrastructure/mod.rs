// Infrastructure module - Reconnect and keepalive timing
pub mod backoff;
pub mod keepalive;

pub use backoff::{Backoff, ReconnectPolicy};
pub use keepalive::{KeepaliveAction, KeepaliveMonitor};
