//! Owner of the single live bridge connection

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BridgeConnection, ConnectionContext};
use crate::driver::Driver;
use crate::transport::Connector;
use crate::types::ConnectionStatus;
use crate::{BridgeConfig, BridgeError, Result};

/// Owns exactly one bridge connection at a time
///
/// Connecting with a new configuration closes the previous socket before the
/// new one is opened. Dropping the manager cancels the live connection, even
/// if it never finished opening.
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    context: ConnectionContext,
    active: Option<ActiveConnection>,
}

struct ActiveConnection {
    connection: BridgeConnection,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, context: ConnectionContext) -> Self {
        Self { connector: Arc::new(connector), context, active: None }
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    /// The connection this manager currently owns, in any state
    pub fn current(&self) -> Option<&BridgeConnection> {
        self.active.as_ref().map(|a| &a.connection)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.current().map(BridgeConnection::status).unwrap_or_default()
    }

    /// Open a connection for `config`
    ///
    /// Returns as soon as the connection is `Connecting`; the open (or
    /// failure) arrives asynchronously. An unchanged config with a connection
    /// still alive returns that connection. An invalid URL is rejected without
    /// touching the current connection.
    pub async fn connect(&mut self, config: BridgeConfig) -> Result<BridgeConnection> {
        config.validate()?;

        if let Some(active) = &self.active {
            let same = active.connection.config() == &config;
            if same && !active.connection.status().is_terminal() {
                debug!(connection_id = active.connection.id(), "Configuration unchanged");
                return Ok(active.connection.clone());
            }
        }

        self.disconnect().await;

        let shutdown_timeout = config.shutdown_timeout();
        let channels = Driver::spawn(Arc::clone(&self.connector), config, self.context.clone());
        info!(
            connection_id = channels.connection.id(),
            url = %channels.connection.url(),
            "Bridge connection requested"
        );

        let connection = channels.connection.clone();
        self.active = Some(ActiveConnection {
            connection: channels.connection,
            cancel: channels.cancel,
            task: Some(channels.task),
            shutdown_timeout,
        });
        Ok(connection)
    }

    /// Close the current connection and wait for its socket to be released
    ///
    /// Never fails; a slow close is abandoned after the shutdown timeout.
    pub async fn disconnect(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let connection_id = active.connection.id();
        debug!(connection_id, "Disconnecting from bridge");

        active.cancel.cancel();
        if let Some(task) = active.task.take() {
            match tokio::time::timeout(active.shutdown_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(connection_id, "Connection task failed: {}", e),
                Err(_) => {
                    let err = BridgeError::Timeout { duration: active.shutdown_timeout };
                    warn!(connection_id, "Abandoning bridge socket close: {}", err);
                }
            }
        }
        // Covers a driver that never got to clear its own entry
        self.context.clear(connection_id);
    }
}
