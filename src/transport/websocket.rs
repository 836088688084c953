use super::{Connector, TransportCommand, TransportEvent, TransportLink, TransportPeer};
use crate::types::constants::{DEFAULT_CONNECT_TIMEOUT, WS_CLOSE_ABNORMAL};
use crate::types::{RealtimeError, Result};
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// "No status received": the server dropped us without a close frame
const CLOSE_NO_STATUS: u16 = 1005;

/// Opens websocket links with tokio-tungstenite
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT))
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<TransportLink>> {
        let connect_timeout = self.connect_timeout;
        Box::pin(async move {
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(RealtimeError::InvalidEndpoint(format!(
                    "unsupported scheme '{}'",
                    url.scheme()
                )));
            }

            tracing::info!("Connecting to {}", url);
            let (ws_stream, _response) =
                tokio::time::timeout(connect_timeout, connect_async(url.as_str()))
                    .await
                    .map_err(|_| {
                        RealtimeError::Connection(format!(
                            "timed out after {}ms",
                            connect_timeout.as_millis()
                        ))
                    })??;

            let (link, peer) = TransportLink::pair();
            tokio::spawn(pump(ws_stream, peer));
            Ok(link)
        })
    }
}

/// Moves frames between the socket and the link until either side closes
async fn pump(ws_stream: WsStream, mut peer: TransportPeer) {
    let (mut write_half, mut read_half) = ws_stream.split();

    let (code, reason) = loop {
        tokio::select! {
            command = peer.commands.recv() => match command {
                Some(TransportCommand::Send(text)) => {
                    if let Err(e) = write_half.send(Message::Text(text.into())).await {
                        tracing::error!("WebSocket write error: {}", e);
                        break (WS_CLOSE_ABNORMAL, e.to_string());
                    }
                }
                Some(TransportCommand::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.clone().into(),
                    };
                    if let Err(e) = write_half.send(Message::Close(Some(frame))).await {
                        tracing::debug!("Close frame not delivered: {}", e);
                    }
                    let _ = write_half.close().await;
                    break (code, reason);
                }
                None => {
                    // Hub dropped the link
                    let _ = write_half.close().await;
                    return;
                }
            },
            message = read_half.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Received text message: {}", text.as_str());
                    if peer.events.send(TransportEvent::Frame(text.as_str().to_owned())).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(close_frame) => {
                            tracing::warn!(
                                "Server closed connection: code={:?}, reason='{}'",
                                close_frame.code,
                                close_frame.reason
                            );
                            break (u16::from(close_frame.code), close_frame.reason.as_str().to_owned());
                        }
                        None => {
                            tracing::warn!("Server closed connection without close frame");
                            break (CLOSE_NO_STATUS, String::new());
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Some(Ok(Message::Pong(data))) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                }
                Some(Ok(Message::Frame(_))) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    break (WS_CLOSE_ABNORMAL, e.to_string());
                }
                None => {
                    break (WS_CLOSE_ABNORMAL, "stream ended".to_string());
                }
            }
        }
    };

    let _ = peer.events.send(TransportEvent::Closed { code, reason });
    tracing::debug!("Transport pump finished");
}
