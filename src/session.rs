//! One dashboard session: connection manager, context, and telemetry view

use tracing::info;

use crate::connection::{BridgeConnection, ConnectionContext, ConnectionManager};
use crate::telemetry::{TelemetrySnapshot, TelemetryViewModel};
use crate::transport::Connector;
use crate::types::ConnectionStatus;
use crate::{BridgeConfig, Result};

/// Everything a dashboard needs for one bridge
///
/// Owns the [`ConnectionManager`] and a [`TelemetryViewModel`] wired to the
/// same [`ConnectionContext`]. Dropping the session tears both down.
pub struct GroundStation<C: Connector> {
    manager: ConnectionManager<C>,
    telemetry: TelemetryViewModel,
    config: BridgeConfig,
}

impl<C: Connector> GroundStation<C> {
    /// Attach the telemetry view and request the first connection
    pub async fn start(connector: C, config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let context = ConnectionContext::new();
        let telemetry = TelemetryViewModel::attach(&context, config.odometry_topic());
        let mut manager = ConnectionManager::new(connector, context);
        manager.connect(config.clone()).await?;

        Ok(Self { manager, telemetry, config })
    }

    /// Switch to a new bridge configuration
    ///
    /// The old socket is closed before the new one opens. The view keeps its
    /// frozen values across the switch unless the odometry stream itself
    /// changed, in which case it is re-attached from scratch.
    pub async fn reconfigure(&mut self, config: BridgeConfig) -> Result<BridgeConnection> {
        let connection = self.manager.connect(config.clone()).await?;

        if !same_stream(&self.config, &config) {
            info!(topic = %config.topic, message_type = %config.odometry_type(), "Odometry stream changed");
            let fresh = TelemetryViewModel::attach(self.manager.context(), config.odometry_topic());
            let old = std::mem::replace(&mut self.telemetry, fresh);
            old.detach().await;
        }
        self.config = config;
        Ok(connection)
    }

    pub fn telemetry(&self) -> &TelemetryViewModel {
        &self.telemetry
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn context(&self) -> &ConnectionContext {
        self.manager.context()
    }

    pub fn connection(&self) -> Option<&BridgeConnection> {
        self.manager.current()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Release the subscription, then close the socket
    pub async fn shutdown(mut self) {
        self.telemetry.detach().await;
        self.manager.disconnect().await;
    }
}

fn same_stream(a: &BridgeConfig, b: &BridgeConfig) -> bool {
    a.topic == b.topic
        && a.odometry_type() == b.odometry_type()
        && a.queue_length == b.queue_length
        && a.throttle == b.throttle
}
