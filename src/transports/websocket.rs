//! WebSocket transport for a rosbridge server

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::transport::{Connector, Transport, TransportEvent};
use crate::{BridgeConfig, BridgeError, Result};

/// Opens real WebSocket connections with tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn open(&self, config: &BridgeConfig) -> Result<WebSocketTransport> {
        let url = config.validate()?;
        debug!(url = %url, "Opening bridge WebSocket");

        let (stream, response) = connect_async(url.as_str()).await.map_err(|e| {
            BridgeError::connection_failed_with_source(
                format!("WebSocket handshake with {} failed", url),
                Box::new(e),
            )
        })?;

        info!(url = %url, http_status = %response.status(), "Bridge WebSocket handshake complete");

        Ok(WebSocketTransport { stream, open_reported: false, closed: false })
    }
}

/// A connected bridge WebSocket
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,

    /// The handshake already finished in `open`; report it as the first event
    open_reported: bool,

    closed: bool,
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if !self.open_reported {
            self.open_reported = true;
            return Some(TransportEvent::Opened);
        }
        if self.closed {
            return None;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(TransportEvent::Message(text)),
                    Err(_) => {
                        warn!(len = bytes.len(), "Ignoring non-UTF-8 binary frame from bridge");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Bridge sent close frame");
                    self.closed = true;
                    return Some(TransportEvent::Closed);
                }
                // Pings are answered by tungstenite itself
                Some(Ok(other)) => trace!(?other, "Ignoring control frame"),
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(TransportEvent::Error { reason: e.to_string(), fatal: true });
                }
                None => {
                    self.closed = true;
                    return Some(TransportEvent::Closed);
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(BridgeError::Closed);
        }
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| BridgeError::transport_error("failed to send frame", Some(Box::new(e))))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => {
                Err(BridgeError::transport_error("failed to close socket", Some(Box::new(e))))
            }
        }
    }
}
