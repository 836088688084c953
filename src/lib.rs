//! # ClearPath Realtime
//!
//! Realtime event hub for the ClearPath package-tracking dashboard. One
//! websocket to the realtime service is shared by every consumer; the hub
//! replays subscriptions after each (re)connect, reconnects with bounded
//! exponential backoff and keeps the link alive with periodic pings.
//!
//! ## Example
//!
//! ```no_run
//! use clearpath_realtime::{HubOptions, MessageType, RealtimeHub, topics};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = RealtimeHub::new(HubOptions::from_env()?);
//!     hub.subscribe(topics::PACKAGE_UPDATES);
//!     hub.subscribe(topics::DASHBOARD_METRICS);
//!     hub.start();
//!
//!     let mut messages = hub.listen();
//!     while let Some(message) = messages.recv().await {
//!         if message.kind == MessageType::PackageUpdate {
//!             println!("package update: {}", message.data);
//!         }
//!     }
//!
//!     hub.stop().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod subscription;
pub mod transport;
pub mod types;

pub use client::{
    ConnectionState, Environment, HubOptions, HubSnapshot, RealtimeHub, RealtimeHubBuilder,
};
pub use messaging::MessageType;
pub use subscription::SubscriptionRegistry;
pub use transport::{
    Connector, TransportCommand, TransportEvent, TransportLink, TransportPeer, WebSocketConnector,
};
pub use types::{
    ConnectionInfo, InboundMessage, OutboundFrame, RealtimeError, Result, topics,
};
