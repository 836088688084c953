use super::{ConnectionState, HubSnapshot};
use crate::infrastructure::{Backoff, KeepaliveAction, KeepaliveMonitor};
use crate::messaging::{MessageRouter, MessageType, RouteOutcome};
use crate::subscription::SubscriptionRegistry;
use crate::transport::{Connector, TransportEvent, TransportLink};
use crate::types::constants::{WS_CLOSE_ABNORMAL, WS_CLOSE_KEEPALIVE_TIMEOUT, WS_CLOSE_NORMAL};
use crate::types::{InboundMessage, OutboundFrame, RealtimeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

/// Requests from [`RealtimeHub`](super::RealtimeHub) handles to the driver
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Stop { ack: oneshot::Sender<()> },
    Subscribe(String),
    Unsubscribe(String),
    Send(OutboundFrame),
    RequestConnectionInfo,
    Listen(mpsc::Sender<InboundMessage>),
}

enum Phase {
    Idle,
    Connect,
    Wait(Duration),
    Exit,
}

/// Connection driver settings, taken from `HubOptions` at build time
pub(crate) struct DriverConfig {
    pub endpoint: Result<Url>,
    pub backoff: Backoff,
    pub keepalive_interval: Duration,
    pub enforce_keepalive_reply: bool,
    pub history_size: usize,
}

/// Owns every piece of mutable hub state.
///
/// Runs as a single task: commands, transport events, the reconnect sleep and
/// the keepalive interval are all multiplexed in one `select!`, so state is
/// never touched concurrently. Consumers only see it through the snapshot.
pub(crate) struct HubDriver {
    endpoint: Result<Url>,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<HubSnapshot>,
    registry: SubscriptionRegistry,
    router: MessageRouter,
    backoff: Backoff,
    keepalive_interval: Duration,
    enforce_keepalive_reply: bool,
}

impl HubDriver {
    pub(crate) fn new(
        config: DriverConfig,
        connector: Arc<dyn Connector>,
        commands: mpsc::UnboundedReceiver<Command>,
        snapshot: watch::Sender<HubSnapshot>,
    ) -> Self {
        Self {
            endpoint: config.endpoint,
            connector,
            commands,
            snapshot,
            registry: SubscriptionRegistry::new(),
            router: MessageRouter::new(config.history_size),
            backoff: config.backoff,
            keepalive_interval: config.keepalive_interval,
            enforce_keepalive_reply: config.enforce_keepalive_reply,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => self.idle().await,
                Phase::Connect => self.connect().await,
                Phase::Wait(delay) => self.wait(delay).await,
                Phase::Exit => break,
            };
        }
        tracing::info!("Realtime hub driver finished");
    }

    /// Not connected and nothing scheduled; waits for `start()`
    async fn idle(&mut self) -> Phase {
        loop {
            match self.commands.recv().await {
                None => return Phase::Exit,
                Some(Command::Start) => {
                    self.backoff.reset();
                    self.snapshot.send_modify(|s| {
                        s.retry_count = 0;
                        s.last_error = None;
                    });
                    return Phase::Connect;
                }
                Some(Command::Stop { ack }) => {
                    if !self.state().is_terminal() {
                        self.set_state(ConnectionState::Closed);
                    }
                    let _ = ack.send(());
                }
                Some(other) => self.handle_offline(other),
            }
        }
    }

    /// One connection attempt, cancellable by `stop()`
    async fn connect(&mut self) -> Phase {
        self.set_state(ConnectionState::Connecting);

        let url = match &self.endpoint {
            Ok(url) => url.clone(),
            Err(e) => {
                let e = e.clone();
                self.fail(e);
                return Phase::Idle;
            }
        };

        let mut attempt = self.connector.connect(url);
        loop {
            tokio::select! {
                result = &mut attempt => {
                    return match result {
                        Ok(link) => self.run_open(link).await,
                        Err(e) if e.is_recoverable() => {
                            tracing::warn!("Connection attempt failed: {}", e);
                            self.after_abnormal_close(WS_CLOSE_ABNORMAL, e.to_string())
                        }
                        Err(e) => {
                            self.fail(e);
                            Phase::Idle
                        }
                    };
                }
                command = self.commands.recv() => match command {
                    None => return Phase::Exit,
                    Some(Command::Stop { ack }) => {
                        tracing::info!("Stopped while connecting, attempt abandoned");
                        self.set_state(ConnectionState::Closing);
                        drop(attempt);
                        self.mark_closed();
                        let _ = ack.send(());
                        return Phase::Idle;
                    }
                    Some(Command::Start) => {}
                    Some(other) => self.handle_offline(other),
                }
            }
        }
    }

    /// Reconnect delay, cancellable by `stop()`
    async fn wait(&mut self, delay: Duration) -> Phase {
        let mut sleep = Box::pin(tokio::time::sleep(delay));

        loop {
            tokio::select! {
                _ = &mut sleep => return Phase::Connect,
                command = self.commands.recv() => match command {
                    None => return Phase::Exit,
                    Some(Command::Stop { ack }) => {
                        tracing::info!("Stopped during backoff, reconnect cancelled");
                        self.set_state(ConnectionState::Closing);
                        drop(sleep);
                        self.mark_closed();
                        let _ = ack.send(());
                        return Phase::Idle;
                    }
                    Some(Command::Start) => {}
                    Some(other) => self.handle_offline(other),
                }
            }
        }
    }

    /// Serves one open link until it closes or the hub stops
    async fn run_open(&mut self, mut link: TransportLink) -> Phase {
        self.backoff.reset();
        self.snapshot.send_modify(|s| {
            s.state = ConnectionState::Open;
            s.retry_count = 0;
            s.last_error = None;
        });
        tracing::info!("Connected to realtime service");

        // Replay goes out before any command queued behind the open
        for frame in self.registry.replay() {
            self.transmit(&link, &frame);
        }
        tracing::debug!("Replayed {} subscriptions", self.registry.len());

        let mut keepalive =
            KeepaliveMonitor::start(self.keepalive_interval, self.enforce_keepalive_reply);

        let ack = loop {
            // Consumer commands first, so a listener registered before a
            // frame arrives sees that frame
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    None => {
                        link.close(WS_CLOSE_NORMAL, "hub dropped");
                        return Phase::Exit;
                    }
                    Some(Command::Stop { ack }) => {
                        self.set_state(ConnectionState::Closing);
                        link.close(WS_CLOSE_NORMAL, "client stop");
                        break ack;
                    }
                    Some(Command::Start) => {}
                    Some(Command::Subscribe(topic)) => {
                        if self.registry.insert(&topic) {
                            tracing::info!("Subscribing to {}", topic);
                            self.transmit(&link, &OutboundFrame::subscribe(&topic));
                            self.publish_subscriptions();
                        }
                    }
                    Some(Command::Unsubscribe(topic)) => {
                        if self.registry.remove(&topic) {
                            tracing::info!("Unsubscribing from {}", topic);
                            self.transmit(&link, &OutboundFrame::unsubscribe(&topic));
                            self.publish_subscriptions();
                        }
                    }
                    Some(Command::Send(frame)) => self.transmit(&link, &frame),
                    Some(Command::RequestConnectionInfo) => {
                        self.transmit(&link, &OutboundFrame::connection_info_request());
                    }
                    Some(Command::Listen(sender)) => self.router.add_listener(sender),
                },
                event = link.inbound.recv() => match event {
                    Some(TransportEvent::Frame(text)) => {
                        keepalive.record_inbound();
                        self.on_frame(&text);
                    }
                    Some(TransportEvent::Closed { code, reason }) if code == WS_CLOSE_NORMAL => {
                        tracing::info!("Server closed connection normally: '{}'", reason);
                        self.mark_closed();
                        return Phase::Idle;
                    }
                    Some(TransportEvent::Closed { code, reason }) => {
                        return self.after_abnormal_close(code, reason);
                    }
                    None => {
                        return self.after_abnormal_close(WS_CLOSE_ABNORMAL, "transport dropped".to_string());
                    }
                },
                action = keepalive.tick() => match action {
                    KeepaliveAction::SendPing(frame) => {
                        tracing::debug!("Sending keepalive ping");
                        self.transmit(&link, &frame);
                    }
                    KeepaliveAction::Expired => {
                        link.close(WS_CLOSE_KEEPALIVE_TIMEOUT, "keepalive timeout");
                        return self.after_abnormal_close(
                            WS_CLOSE_KEEPALIVE_TIMEOUT,
                            "keepalive timeout".to_string(),
                        );
                    }
                },
            }
        };

        // Release the link and the keepalive timer before acknowledging
        drop(keepalive);
        drop(link);
        self.mark_closed();
        tracing::info!("Disconnected from realtime service");
        let _ = ack.send(());
        Phase::Idle
    }

    /// Records the close and schedules the next attempt, or gives up
    fn after_abnormal_close(&mut self, code: u16, reason: String) -> Phase {
        tracing::warn!("Connection closed abnormally: code={}, reason='{}'", code, reason);
        self.mark_closed();
        self.snapshot.send_modify(|s| {
            s.last_error = Some(RealtimeError::AbnormalClose {
                code,
                reason: reason.clone(),
            });
        });

        match self.backoff.next_delay() {
            Some(delay) => {
                let attempt = self.backoff.attempts();
                tracing::info!(
                    "Reconnecting in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    self.backoff.policy().max_retries
                );
                self.snapshot.send_modify(|s| s.retry_count = attempt);
                Phase::Wait(delay)
            }
            None => {
                let attempts = self.backoff.attempts();
                self.fail(RealtimeError::RetriesExhausted { attempts });
                Phase::Idle
            }
        }
    }

    fn on_frame(&mut self, text: &str) {
        match self.router.route(text) {
            RouteOutcome::Malformed(e) => {
                self.snapshot.send_modify(|s| s.last_error = Some(e));
            }
            RouteOutcome::Handshake {
                connection_id,
                info,
            } => {
                tracing::info!("Connection identified as {}", connection_id);
                self.snapshot.send_modify(|s| {
                    s.connection_id = Some(connection_id);
                    if info.is_some() {
                        s.connection_info = info;
                    }
                });
            }
            RouteOutcome::Dispatched(kind) => {
                let server_error = match (&kind, self.router.last_message()) {
                    (MessageType::Error, Some(message)) => MessageRouter::server_error(message),
                    _ => None,
                };
                if let Some(e) = &server_error {
                    tracing::warn!("Server reported error: {}", e);
                }

                let last = self.router.last_message().cloned();
                let recent: Vec<InboundMessage> = self.router.history().cloned().collect();
                self.snapshot.send_modify(|s| {
                    s.last_message = last;
                    s.recent_messages = recent;
                    if server_error.is_some() {
                        s.last_error = server_error;
                    }
                });
            }
        }
    }

    /// Commands that arrive while there is no open link
    fn handle_offline(&mut self, command: Command) {
        match command {
            Command::Subscribe(topic) => {
                if self.registry.insert(&topic) {
                    tracing::debug!("Queued subscription {} for next open", topic);
                    self.publish_subscriptions();
                }
            }
            Command::Unsubscribe(topic) => {
                if self.registry.remove(&topic) {
                    self.publish_subscriptions();
                }
            }
            Command::Send(frame) => {
                tracing::warn!("Dropping '{}' frame: not connected", frame.kind);
                self.snapshot
                    .send_modify(|s| s.last_error = Some(RealtimeError::NotConnected));
            }
            Command::RequestConnectionInfo => {
                self.snapshot
                    .send_modify(|s| s.last_error = Some(RealtimeError::NotConnected));
            }
            Command::Listen(sender) => self.router.add_listener(sender),
            Command::Start | Command::Stop { .. } => {}
        }
    }

    fn transmit(&mut self, link: &TransportLink, frame: &OutboundFrame) {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize '{}' frame: {}", frame.kind, e);
                self.snapshot.send_modify(|s| s.last_error = Some(e.into()));
                return;
            }
        };
        if !link.send_text(text) {
            // Close event follows from the transport
            tracing::warn!("Transport gone, '{}' frame not sent", frame.kind);
        }
    }

    fn publish_subscriptions(&self) {
        let topics = self.registry.topics().to_vec();
        self.snapshot.send_modify(|s| s.subscriptions = topics);
    }

    fn fail(&mut self, error: RealtimeError) {
        tracing::error!("Realtime hub failed: {}", error);
        self.snapshot.send_modify(|s| {
            s.state = ConnectionState::Failed;
            s.connection_id = None;
            s.connection_info = None;
            s.last_error = Some(error);
        });
    }

    /// Link is gone: per-connection identity goes with it
    fn mark_closed(&self) {
        self.snapshot.send_modify(|s| {
            s.state = ConnectionState::Closed;
            s.connection_id = None;
            s.connection_info = None;
        });
    }

    fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    fn set_state(&self, state: ConnectionState) {
        self.snapshot.send_modify(|s| s.state = state);
    }
}
