//! Session-wide holder for the live bridge connection
//!
//! One context exists per application session and is passed to every
//! consumer explicitly. It starts empty, holds the connection while it is
//! connected, and is cleared again when that connection closes or fails.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use super::BridgeConnection;

/// What consumers see through the context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkState {
    pub connection: Option<BridgeConnection>,
    pub is_connected: bool,
}

impl LinkState {
    /// The connection, but only while it can carry subscriptions
    pub fn live_connection(&self) -> Option<&BridgeConnection> {
        self.connection.as_ref().filter(|c| self.is_connected && c.is_connected())
    }
}

/// Broadcasts the single bridge connection to all consumers
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    state: Arc<watch::Sender<LinkState>>,
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LinkState::default());
        Self { state: Arc::new(state) }
    }

    pub fn snapshot(&self) -> LinkState {
        self.state.borrow().clone()
    }

    pub fn connection(&self) -> Option<BridgeConnection> {
        self.state.borrow().connection.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected
    }

    /// Receiver that is notified on every change
    pub fn watch(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Current state first, then every change
    pub fn updates(&self) -> impl Stream<Item = LinkState> + 'static {
        WatchStream::new(self.watch())
    }

    pub(crate) fn publish(&self, connection: BridgeConnection) {
        debug!(connection_id = connection.id(), "Publishing connection to context");
        self.state.send_replace(LinkState { connection: Some(connection), is_connected: true });
    }

    /// Clear the context if it still holds `connection_id`
    ///
    /// A late close from a replaced connection must not wipe its successor.
    pub(crate) fn clear(&self, connection_id: u64) -> bool {
        let cleared = self.state.send_if_modified(|state| {
            if state.connection.as_ref().map(|c| c.id()) == Some(connection_id) {
                *state = LinkState::default();
                true
            } else {
                false
            }
        });
        if cleared {
            debug!(connection_id, "Cleared connection from context");
        }
        cleared
    }
}
