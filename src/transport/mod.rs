//! Low-level bidirectional link to the realtime service.
//!
//! A [`Connector`] opens one link per connection attempt. The link is a pair
//! of channels so the hub never touches socket types directly: it pushes
//! [`TransportCommand`]s and receives [`TransportEvent`]s. The production
//! connector is [`WebSocketConnector`]; tests plug in a channel-backed fake.

mod websocket;

pub use websocket::WebSocketConnector;

use crate::types::Result;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use url::Url;

/// Something the transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text frame from the server
    Frame(String),
    /// Link is gone. 1000 means a normal close, anything else is abnormal.
    Closed { code: u16, reason: String },
}

/// Something the hub asks the transport to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Send(String),
    Close { code: u16, reason: String },
}

/// Hub side of an open link
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<TransportCommand>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Socket side of an open link
#[derive(Debug)]
pub struct TransportPeer {
    pub commands: mpsc::UnboundedReceiver<TransportCommand>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportLink {
    /// Creates a connected link/peer pair
    pub fn pair() -> (TransportLink, TransportPeer) {
        let (outbound, commands) = mpsc::unbounded_channel();
        let (events, inbound) = mpsc::unbounded_channel();
        (
            TransportLink { outbound, inbound },
            TransportPeer { commands, events },
        )
    }

    /// Queues a text frame. Returns `false` if the socket side is gone.
    pub fn send_text(&self, text: String) -> bool {
        self.outbound.send(TransportCommand::Send(text)).is_ok()
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.outbound.send(TransportCommand::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

/// Opens transport links
pub trait Connector: Send + Sync + 'static {
    /// Opens one link to `url`.
    ///
    /// Errors for which [`RealtimeError::is_recoverable`](crate::RealtimeError::is_recoverable)
    /// is false put the hub into `Failed`; all others go through backoff.
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<TransportLink>>;
}
