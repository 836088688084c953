// Messaging module - Message classification and fan-out
pub mod event;
pub mod router;

pub use event::MessageType;
pub use router::{MessageRouter, RouteOutcome};
