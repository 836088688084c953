use super::driver::{DriverConfig, HubDriver};
use super::{HubInner, HubOptions, HubSnapshot, RealtimeHub};
use crate::infrastructure::Backoff;
use crate::transport::{Connector, WebSocketConnector};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Builder for [`RealtimeHub`] that wires the driver task
pub struct RealtimeHubBuilder {
    options: HubOptions,
    connector: Option<Arc<dyn Connector>>,
}

impl RealtimeHubBuilder {
    /// Create a new builder
    pub fn new(options: HubOptions) -> Self {
        Self {
            options,
            connector: None,
        }
    }

    /// Replace the websocket transport, e.g. with an in-memory fake in tests
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Build the hub and spawn its driver task.
    ///
    /// Never fails: invalid options or an unusable endpoint are reported by
    /// `start()`, which moves the hub to `Failed`. Must be called inside a
    /// tokio runtime.
    ///
    /// The driver is detached. It stops on its own once the last hub handle
    /// is dropped, closing an open link with code 1000.
    pub fn build(self) -> RealtimeHub {
        let options = self.options;
        let connector = self.connector.unwrap_or_else(|| {
            Arc::new(WebSocketConnector::new(options.connect_timeout())) as Arc<dyn Connector>
        });

        let endpoint = options.validate().and_then(|()| options.endpoint_url());
        if let Err(e) = &endpoint {
            tracing::warn!("Realtime hub cannot connect: {}", e);
        }

        let config = DriverConfig {
            endpoint,
            backoff: Backoff::new(options.reconnect_policy()),
            keepalive_interval: options.keepalive_interval(),
            enforce_keepalive_reply: options.keepalive_reply_timeout,
            history_size: options.history_size,
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(HubSnapshot::default());

        let driver = HubDriver::new(config, connector, command_rx, snapshot_tx);
        tokio::spawn(driver.run());

        RealtimeHub {
            inner: Arc::new(HubInner {
                commands: command_tx,
                snapshot: snapshot_rx,
                options,
            }),
        }
    }
}
