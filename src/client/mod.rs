// Module declarations
mod builder;
mod connection;
mod core;
mod driver;
mod options;
mod state;

// Public API exports
pub use builder::RealtimeHubBuilder;
pub use connection::ConnectionState;
pub use self::core::RealtimeHub;
pub use options::{Environment, HubOptions};
pub use state::HubSnapshot;

pub(crate) use self::core::HubInner;
