use super::driver::Command;
use super::{ConnectionState, HubOptions, HubSnapshot, RealtimeHubBuilder};
use crate::types::{ConnectionInfo, InboundMessage, OutboundFrame, RealtimeError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// The single realtime connection shared by every dashboard consumer.
///
/// `RealtimeHub` is a cheap handle: clone it and pass it around. All state
/// lives in one background driver task; the handle enqueues commands and
/// reads the latest [`HubSnapshot`]. Operations never return errors, failures
/// surface through [`last_error()`](Self::last_error) and the logs.
///
/// # Example
///
/// ```no_run
/// use clearpath_realtime::{HubOptions, RealtimeHub, topics};
///
/// # async fn example() {
/// let hub = RealtimeHub::new(HubOptions::default());
/// hub.subscribe(topics::PACKAGE_UPDATES);
/// hub.start();
///
/// let mut messages = hub.listen();
/// while let Some(message) = messages.recv().await {
///     println!("{}: {}", message.kind, message.data);
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeHub {
    pub(crate) inner: Arc<HubInner>,
}

pub(crate) struct HubInner {
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) snapshot: watch::Receiver<HubSnapshot>,
    pub(crate) options: HubOptions,
}

impl RealtimeHub {
    /// Creates a hub over the websocket transport.
    ///
    /// Does not connect; call [`start()`](Self::start). Must be called inside
    /// a tokio runtime.
    pub fn new(options: HubOptions) -> Self {
        RealtimeHubBuilder::new(options).build()
    }

    pub fn builder(options: HubOptions) -> RealtimeHubBuilder {
        RealtimeHubBuilder::new(options)
    }

    pub fn options(&self) -> &HubOptions {
        &self.inner.options
    }

    /// Opens the connection. From `Failed` this starts a fresh retry budget;
    /// while already open or connecting it does nothing.
    pub fn start(&self) {
        self.command(Command::Start);
    }

    /// Closes the connection with code 1000 and cancels any pending
    /// reconnect. Returns once the link is closed and timers are released.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use clearpath_realtime::{HubOptions, RealtimeHub};
    /// # async fn example() {
    /// let hub = RealtimeHub::new(HubOptions::default());
    /// hub.start();
    /// // ...
    /// hub.stop().await;
    /// assert!(!hub.is_connected());
    /// # }
    /// ```
    pub async fn stop(&self) {
        let (ack, done) = oneshot::channel();
        if self.inner.commands.send(Command::Stop { ack }).is_err() {
            return;
        }
        // Err only if the driver is gone, which is stopped as well
        let _ = done.await;
    }

    /// Adds `topic` to the desired set. Sent right away when open, otherwise
    /// on the next open.
    pub fn subscribe(&self, topic: impl Into<String>) {
        self.command(Command::Subscribe(topic.into()));
    }

    pub fn unsubscribe(&self, topic: impl Into<String>) {
        self.command(Command::Unsubscribe(topic.into()));
    }

    /// Sends a raw frame. While not open the frame is dropped and
    /// [`RealtimeError::NotConnected`] is recorded.
    pub fn send(&self, frame: OutboundFrame) {
        self.command(Command::Send(frame));
    }

    /// Shorthand for `send(OutboundFrame::new(kind, data))`
    pub fn send_message(&self, kind: impl Into<String>, data: Value) {
        self.send(OutboundFrame::new(kind, data));
    }

    /// Asks the server for its view of this connection; the reply lands in
    /// [`connection_info()`](Self::connection_info).
    pub fn request_connection_info(&self) {
        self.command(Command::RequestConnectionInfo);
    }

    /// Registers a listener that receives every dispatched message.
    ///
    /// Drop the receiver to unsubscribe. A listener that falls
    /// `listener_buffer` messages behind misses messages until it catches up.
    pub fn listen(&self) -> mpsc::Receiver<InboundMessage> {
        let (tx, rx) = mpsc::channel(self.inner.options.listener_buffer.max(1));
        self.command(Command::Listen(tx));
        rx
    }

    /// Change notifications for the whole snapshot
    pub fn watch(&self) -> watch::Receiver<HubSnapshot> {
        self.inner.snapshot.clone()
    }

    pub fn snapshot(&self) -> HubSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.snapshot.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.inner.snapshot.borrow().is_connected()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.inner.snapshot.borrow().connection_id.clone()
    }

    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.inner.snapshot.borrow().connection_info.clone()
    }

    pub fn last_message(&self) -> Option<InboundMessage> {
        self.inner.snapshot.borrow().last_message.clone()
    }

    /// Newest first
    pub fn recent_messages(&self) -> Vec<InboundMessage> {
        self.inner.snapshot.borrow().recent_messages.clone()
    }

    pub fn last_error(&self) -> Option<RealtimeError> {
        self.inner.snapshot.borrow().last_error.clone()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.snapshot.borrow().retry_count
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.snapshot.borrow().subscriptions.clone()
    }

    fn command(&self, command: Command) {
        if self.inner.commands.send(command).is_err() {
            tracing::warn!("Realtime hub driver is not running, command ignored");
        }
    }
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.borrow();
        f.debug_struct("RealtimeHub")
            .field("state", &snapshot.state)
            .field("connection_id", &snapshot.connection_id)
            .field("subscriptions", &snapshot.subscriptions)
            .finish()
    }
}
