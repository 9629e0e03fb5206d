//! Transport traits for bridge sockets

use crate::{BridgeConfig, Result};

/// One discrete notification from the socket
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake finished, frames may flow
    Opened,
    /// A text frame from the bridge
    Message(String),
    /// Something went wrong. `fatal` errors mean the socket is unusable and
    /// no further events will follow.
    Error { reason: String, fatal: bool },
    /// The peer closed the socket
    Closed,
}

/// A bridge socket
///
/// Transports abstract over the real WebSocket and in-process fakes. A
/// transport is owned by exactly one connection driver.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next event
    ///
    /// Returns:
    /// - `Some(event)` - Something happened on the socket
    /// - `None` - The event source is exhausted (treated as `Closed`)
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Close the socket. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports for a configuration
///
/// `open` may resolve before the socket has finished its handshake; the
/// transport then reports `Opened` as its first event.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn open(&self, config: &BridgeConfig) -> Result<Self::Transport>;
}
