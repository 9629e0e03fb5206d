//! In-process transport backed by channels
//!
//! Every `open` hands a [`ChannelPeer`] to whoever holds the [`ChannelPeers`]
//! receiver. The peer plays the bridge: it decides when the socket opens,
//! injects messages and errors, closes the socket, and sees every frame the
//! client sends. Hosts use it to embed a simulated vehicle; tests use it to
//! drive the connection lifecycle deterministically.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::protocol::BridgeOp;
use crate::transport::{Connector, Transport, TransportEvent};
use crate::{BridgeConfig, BridgeError, Result};

/// Socket lifecycle record kept by a [`ChannelConnector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Opened(String),
    Closed(String),
}

struct Shared {
    peers: mpsc::UnboundedSender<ChannelPeer>,
    journal: Mutex<Vec<JournalEntry>>,
    refusal: Mutex<Option<String>>,
}

impl Shared {
    fn record(&self, entry: JournalEntry) {
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
    }
}

/// Connector producing [`ChannelTransport`]s
#[derive(Clone)]
pub struct ChannelConnector {
    shared: Arc<Shared>,
}

/// Receiving end for the peers of opened transports
pub struct ChannelPeers {
    rx: mpsc::UnboundedReceiver<ChannelPeer>,
}

impl ChannelPeers {
    /// Wait for the next transport to be opened
    pub async fn next(&mut self) -> Option<ChannelPeer> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<ChannelPeer> {
        self.rx.try_recv().ok()
    }
}

impl ChannelConnector {
    pub fn new() -> (Self, ChannelPeers) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared =
            Shared { peers: tx, journal: Mutex::new(Vec::new()), refusal: Mutex::new(None) };
        (Self { shared: Arc::new(shared) }, ChannelPeers { rx })
    }

    /// Make the next `open` fail as if the bridge refused the connection
    pub fn refuse_next(&self, reason: impl Into<String>) {
        *self.shared.refusal.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    /// Opens and closes in the order they happened
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.shared.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl Connector for ChannelConnector {
    type Transport = ChannelTransport;

    async fn open(&self, config: &BridgeConfig) -> Result<ChannelTransport> {
        let refusal = self.shared.refusal.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(reason) = refusal {
            return Err(BridgeError::connection_failed(reason));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let peer = ChannelPeer {
            url: config.url.clone(),
            domain_id: config.domain_id.clone(),
            events: event_tx,
            sent: sent_rx,
            closed: closed_rx,
        };
        if self.shared.peers.send(peer).is_err() {
            return Err(BridgeError::connection_failed("no peer is listening"));
        }

        self.shared.record(JournalEntry::Opened(config.url.clone()));
        debug!(url = %config.url, "Opened channel transport");

        Ok(ChannelTransport {
            url: config.url.clone(),
            events: event_rx,
            sent: sent_tx,
            closed: closed_tx,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Client side of an in-process socket
pub struct ChannelTransport {
    url: String,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<String>,
    closed: watch::Sender<bool>,
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        let closed = *self.closed.borrow();
        if closed {
            return None;
        }
        self.events.recv().await
    }

    async fn send(&mut self, text: String) -> Result<()> {
        let closed = *self.closed.borrow();
        if closed {
            return Err(BridgeError::Closed);
        }
        self.sent.send(text).map_err(|_| BridgeError::transport_error("peer went away", None))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed.send_replace(true) {
            self.shared.record(JournalEntry::Closed(self.url.clone()));
            debug!(url = %self.url, "Closed channel transport");
        }
        Ok(())
    }
}

/// Bridge side of an in-process socket
pub struct ChannelPeer {
    url: String,
    domain_id: Option<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: watch::Receiver<bool>,
}

impl ChannelPeer {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.domain_id.as_deref()
    }

    /// Finish the handshake
    pub fn open(&self) {
        self.emit(TransportEvent::Opened);
    }

    /// Publish a message on a topic, wrapped as a rosbridge `publish` op
    pub fn publish(&self, topic: &str, msg: Value) {
        let op = BridgeOp::Publish { topic: topic.to_string(), msg };
        match op.encode() {
            Ok(text) => self.emit(TransportEvent::Message(text)),
            Err(e) => debug!(error = %e, "Failed to encode publish op"),
        }
    }

    /// Send a raw text frame, valid JSON or not
    pub fn send_raw(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    pub fn error(&self, reason: impl Into<String>, fatal: bool) {
        self.emit(TransportEvent::Error { reason: reason.into(), fatal });
    }

    /// Close the socket from the bridge side
    pub fn close(&self) {
        self.emit(TransportEvent::Closed);
    }

    /// Next frame the client sent, decoded
    pub async fn next_op(&mut self) -> Option<BridgeOp> {
        let text = self.sent.recv().await?;
        BridgeOp::decode(&text).ok()
    }

    pub fn try_next_op(&mut self) -> Option<BridgeOp> {
        let text = self.sent.try_recv().ok()?;
        BridgeOp::decode(&text).ok()
    }

    /// True once the client closed its end (or dropped it)
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.closed.has_changed().is_err()
    }

    /// Wait until the client closes its end
    pub async fn closed(&mut self) {
        let _ = self.closed.wait_for(|closed| *closed).await;
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!(url = %self.url, "Client side already dropped; event discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn peer_drives_transport_events() {
        let (connector, mut peers) = ChannelConnector::new();
        let mut transport = connector.open(&BridgeConfig::default()).await.unwrap();
        let peer = peers.next().await.unwrap();
        assert_eq!(peer.url(), "ws://localhost:9090");

        peer.open();
        peer.send_raw("hello");
        peer.error("glitch", false);
        peer.close();

        assert_eq!(transport.next_event().await, Some(TransportEvent::Opened));
        assert_eq!(transport.next_event().await, Some(TransportEvent::Message("hello".into())));
        assert_eq!(
            transport.next_event().await,
            Some(TransportEvent::Error { reason: "glitch".into(), fatal: false })
        );
        assert_eq!(transport.next_event().await, Some(TransportEvent::Closed));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_journaled_once() {
        let (connector, mut peers) = ChannelConnector::new();
        let mut transport = connector.open(&BridgeConfig::default()).await.unwrap();
        let mut peer = peers.next().await.unwrap();

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        peer.closed().await;

        assert!(peer.is_closed());
        assert!(matches!(transport.send("late".into()).await, Err(BridgeError::Closed)));
        assert_eq!(
            connector.journal(),
            vec![
                JournalEntry::Opened("ws://localhost:9090".into()),
                JournalEntry::Closed("ws://localhost:9090".into())
            ]
        );
    }

    #[tokio::test]
    async fn refusal_applies_to_one_open() {
        let (connector, mut peers) = ChannelConnector::new();
        connector.refuse_next("bridge offline");

        let err = connector.open(&BridgeConfig::default()).await.err().unwrap();
        assert!(err.to_string().contains("bridge offline"));
        assert!(peers.try_next().is_none());

        assert!(connector.open(&BridgeConfig::default()).await.is_ok());
        assert!(peers.try_next().is_some());
    }
}
