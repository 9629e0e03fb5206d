//! Live odometry monitor
//!
//! Connects to a rosbridge server and prints the telemetry panel a few times
//! per second until Ctrl-C.
//!
//! ```text
//! cargo run --example odom_monitor -- [bridge.yaml]
//! RUST_LOG=groundlink=debug cargo run --example odom_monitor
//! ```

use anyhow::{Context, Result};
use futures::StreamExt;
use groundlink::render::{render_panel, status_label};
use groundlink::{BridgeConfig, GroundLink, UpdateRate};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::from_file(&path)
            .with_context(|| format!("loading bridge config from {}", path))?,
        None => BridgeConfig::default(),
    };
    info!(url = %config.url, topic = %config.topic, "Starting odometry monitor");

    let station = GroundLink::connect(config).await.context("starting session")?;
    if let Some(connection) = station.connection() {
        let status = connection.settled().await;
        info!(status = status_label(status), "Bridge settled");
        if !status.is_connected() {
            warn!("Bridge unreachable; is rosbridge_server running?");
        }
    }

    let mut updates = station.telemetry().updates(UpdateRate::Max(4));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = updates.next() => match snapshot {
                Some(snapshot) => println!("{}", render_panel(&snapshot)),
                None => break,
            },
        }
    }

    info!("Shutting down");
    station.shutdown().await;
    Ok(())
}
