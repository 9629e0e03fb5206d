//! Telemetry core for a drone ground-control dashboard.
//!
//! GroundLink connects to a rosbridge server over WebSocket, subscribes to the
//! vehicle's odometry stream, and turns each sample into display-ready values:
//! ground speed, altitude, vertical speed, and roll/pitch/yaw.
//!
//! # Architecture
//!
//! - [`ConnectionManager`] owns the single live [`BridgeConnection`]. A new
//!   configuration closes the old socket before the new one opens.
//! - [`ConnectionContext`] broadcasts that connection to every consumer.
//! - [`subscribe`] binds a callback to a topic while the connection is up.
//! - [`TelemetryViewModel`] follows the context and keeps the latest sample,
//!   freezing its values while the bridge is away.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use groundlink::{BridgeConfig, GroundLink, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> groundlink::Result<()> {
//!     let station = GroundLink::connect(BridgeConfig::new("ws://192.168.1.20:9090")).await?;
//!     let mut updates = station.telemetry().updates(UpdateRate::Max(4));
//!
//!     while let Some(snapshot) = updates.next().await {
//!         println!("{}", groundlink::render::render_panel(&snapshot));
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod config;
pub mod conversions;
mod error;
pub mod protocol;
#[doc(hidden)]
pub mod test_utils;
pub mod types;

// Connection and delivery
pub mod connection;
mod driver;
pub mod stream;
pub mod subscription;
pub mod transport;
pub mod transports;

// Presentation
pub mod render;
mod session;
pub mod telemetry;

// Core exports
pub use config::{BridgeConfig, DEFAULT_BRIDGE_URL};
pub use error::*;
pub use types::*;

// Main API exports
pub use connection::{BridgeConnection, ConnectionContext, ConnectionManager, LinkState};
pub use conversions::{EulerAngles, Quaternion, quaternion_to_rpy, stamp_to_seconds};
pub use session::GroundStation;
pub use subscription::{Subscription, Topic, subscribe};
pub use telemetry::{DerivedTelemetry, Point, TelemetryDisplay, TelemetrySnapshot, TelemetryViewModel};
pub use transport::{Connector, Transport, TransportEvent};
pub use transports::{ChannelConnector, ChannelPeer, WebSocketConnector};

/// Unified entry point for GroundLink sessions.
///
/// # Examples
///
/// ```rust,no_run
/// use groundlink::{BridgeConfig, GroundLink};
///
/// #[tokio::main]
/// async fn main() -> groundlink::Result<()> {
///     let config = BridgeConfig::from_file("bridge.yaml")?;
///     let station = GroundLink::connect(config).await?;
///     // Use station...
///     station.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct GroundLink;

impl GroundLink {
    /// Start a session against a real rosbridge WebSocket.
    ///
    /// Returns once the connection is requested; use
    /// [`BridgeConnection::settled`] to wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidUrl`] if the endpoint is not a `ws://` or
    /// `wss://` URL, or [`BridgeError::ConfigParse`] for a zero queue length.
    pub async fn connect(config: BridgeConfig) -> Result<GroundStation<WebSocketConnector>> {
        GroundStation::start(WebSocketConnector, config).await
    }

    /// Start a session over any [`Connector`], such as a simulated bridge.
    pub async fn with_connector<C: Connector>(
        connector: C,
        config: BridgeConfig,
    ) -> Result<GroundStation<C>> {
        GroundStation::start(connector, config).await
    }
}
