//! Driver owns a bridge transport and routes its traffic

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::connection::{BridgeConnection, ConnectionContext};
use crate::protocol::BridgeOp;
use crate::transport::{Connector, Transport, TransportEvent};
use crate::types::ConnectionStatus;
use crate::BridgeConfig;

/// Requests from connection handles to the driver task
pub(crate) enum Command {
    Subscribe { route: Route, op: BridgeOp },
    Unsubscribe { id: String, topic: String },
}

/// Where messages for one subscription go
pub(crate) struct Route {
    pub id: String,
    pub topic: String,
    pub sink: Sink,
}

pub(crate) enum Sink {
    /// Queue depth 1: only the newest unread message survives
    Latest(watch::Sender<Option<Arc<Value>>>),
    /// Bounded queue; arrivals are dropped while it is full
    Queued(mpsc::Sender<Arc<Value>>),
}

impl Sink {
    /// Returns false once the subscriber side is gone
    fn deliver(&self, msg: &Arc<Value>) -> bool {
        match self {
            Sink::Latest(tx) => tx.send(Some(Arc::clone(msg))).is_ok(),
            Sink::Queued(tx) => match tx.try_send(Arc::clone(msg)) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!("Subscriber queue full, dropping message");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            },
        }
    }
}

/// Result of spawning a driver task
pub(crate) struct DriverChannels {
    /// Handle shared with consumers
    pub connection: BridgeConnection,
    /// Cancellation token for teardown
    pub cancel: CancellationToken,
    /// Completes once the transport has been closed
    pub task: JoinHandle<()>,
}

/// Driver spawns and manages one connection task
///
/// The task owns the transport. It is the single dispatcher for transport
/// events: it moves the status through its lifecycle, publishes or clears the
/// handle in the context, and routes inbound `publish` ops to subscriptions.
pub(crate) struct Driver;

impl Driver {
    pub fn spawn<C>(
        connector: Arc<C>,
        config: BridgeConfig,
        context: ConnectionContext,
    ) -> DriverChannels
    where
        C: Connector,
    {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let connection = BridgeConnection::new(config, status_rx, command_tx);
        let handle = connection.clone();
        let cancel_task = cancel.clone();

        let task = tokio::spawn(async move {
            Self::connection_task(connector, handle, status_tx, command_rx, context, cancel_task)
                .await;
        });

        DriverChannels { connection, cancel, task }
    }

    async fn connection_task<C>(
        connector: Arc<C>,
        handle: BridgeConnection,
        status_tx: watch::Sender<ConnectionStatus>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        context: ConnectionContext,
        cancel: CancellationToken,
    ) where
        C: Connector,
    {
        let connection_id = handle.id();
        info!(
            connection_id,
            url = %handle.url(),
            domain_id = ?handle.domain_id(),
            "Connecting to bridge"
        );

        // Teardown may arrive before the socket ever opens
        let mut transport = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(connection_id, "Connection cancelled before transport opened");
                status_tx.send_replace(ConnectionStatus::Disconnected);
                return;
            }
            result = connector.open(handle.config()) => match result {
                Ok(transport) => transport,
                Err(e) => {
                    error!(connection_id, url = %handle.url(), "Failed to connect to bridge: {}", e);
                    status_tx.send_replace(ConnectionStatus::Errored);
                    return;
                }
            },
        };

        let mut routes: HashMap<String, Vec<Route>> = HashMap::new();
        let mut message_count = 0u64;

        let final_status = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(connection_id, "Connection cancelled");
                    break ConnectionStatus::Disconnected;
                }
                Some(command) = commands.recv() => {
                    Self::handle_command(&mut transport, &mut routes, command).await;
                }
                event = transport.next_event() => match event {
                    Some(TransportEvent::Opened) => {
                        status_tx.send_replace(ConnectionStatus::Connected);
                        context.publish(handle.clone());
                        info!(connection_id, url = %handle.url(), "Connected to bridge");
                    }
                    Some(TransportEvent::Message(text)) => {
                        message_count += 1;
                        Self::route_message(&text, &mut routes);
                    }
                    Some(TransportEvent::Error { reason, fatal: true }) => {
                        error!(connection_id, "Bridge transport failed: {}", reason);
                        break ConnectionStatus::Errored;
                    }
                    Some(TransportEvent::Error { reason, fatal: false }) => {
                        warn!(connection_id, "Bridge transport error: {}", reason);
                    }
                    Some(TransportEvent::Closed) | None => {
                        warn!(connection_id, "Bridge connection closed");
                        break ConnectionStatus::Disconnected;
                    }
                },
            }
        };

        status_tx.send_replace(final_status);
        context.clear(connection_id);

        // Dropping the sinks ends every dispatcher on this connection
        let route_count: usize = routes.values().map(Vec::len).sum();
        routes.clear();

        if let Err(e) = transport.close().await {
            debug!(connection_id, "Ignoring error while closing transport: {}", e);
        }

        info!(
            connection_id,
            status = %final_status,
            messages = message_count,
            released_subscriptions = route_count,
            "Bridge connection ended"
        );
    }

    async fn handle_command<T: Transport>(
        transport: &mut T,
        routes: &mut HashMap<String, Vec<Route>>,
        command: Command,
    ) {
        match command {
            Command::Subscribe { route, op } => {
                debug!(id = %route.id, topic = %route.topic, "Subscribing");
                match op.encode() {
                    Ok(text) => {
                        if let Err(e) = transport.send(text).await {
                            warn!(topic = %route.topic, "Failed to send subscribe: {}", e);
                        }
                    }
                    Err(e) => warn!(topic = %route.topic, "Failed to encode subscribe: {}", e),
                }
                routes.entry(route.topic.clone()).or_default().push(route);
            }
            Command::Unsubscribe { id, topic } => {
                debug!(id = %id, topic = %topic, "Unsubscribing");
                if let Some(list) = routes.get_mut(&topic) {
                    list.retain(|route| route.id != id);
                    if list.is_empty() {
                        routes.remove(&topic);
                    }
                }
                let op = BridgeOp::Unsubscribe { id, topic };
                match op.encode() {
                    Ok(text) => {
                        if let Err(e) = transport.send(text).await {
                            debug!("Ignoring unsubscribe send failure: {}", e);
                        }
                    }
                    Err(e) => debug!("Ignoring unsubscribe encode failure: {}", e),
                }
            }
        }
    }

    fn route_message(text: &str, routes: &mut HashMap<String, Vec<Route>>) {
        let op = match BridgeOp::decode(text) {
            Ok(op) => op,
            Err(e) => {
                warn!("Dropping malformed bridge frame: {}", e);
                return;
            }
        };

        match op {
            BridgeOp::Publish { topic, msg } => {
                let Some(list) = routes.get_mut(&topic) else {
                    trace!(topic = %topic, "No subscriber for topic");
                    return;
                };
                let msg = Arc::new(msg);
                list.retain(|route| route.sink.deliver(&msg));
                if list.is_empty() {
                    routes.remove(&topic);
                }
            }
            BridgeOp::Status { level, msg, .. } => match level.as_deref() {
                Some("error") | Some("warning") => {
                    warn!(level = ?level, "Bridge status: {}", msg.unwrap_or_default());
                }
                _ => debug!(level = ?level, "Bridge status: {}", msg.unwrap_or_default()),
            },
            other => debug!(?other, "Ignoring bridge op"),
        }
    }
}
