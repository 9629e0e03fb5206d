//! Telemetry view model
//!
//! Turns the latest odometry sample into display-ready values. The view model
//! follows the [`ConnectionContext`]: it subscribes when a connected bridge
//! appears, releases the subscription when the bridge goes away, and keeps
//! showing the last values it had (freeze-on-disconnect) until new samples
//! arrive on a later connection.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::{ConnectionContext, LinkState};
use crate::conversions::{EulerAngles, ground_speed, quaternion_to_rpy, stamp_to_seconds};
use crate::stream::ThrottleExt;
use crate::subscription::{Subscription, Topic, subscribe};
use crate::types::{OdometryMessage, UpdateRate, Vector3};

/// Placeholder shown for values with no data
pub const NO_DATA: &str = "--";

/// Fixed three-decimal formatting, or [`NO_DATA`] for missing and NaN values
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.3}", v),
        _ => NO_DATA.to_string(),
    }
}

/// A point in the odometry frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Values computed from one odometry sample
///
/// `None` means "no data", never zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct DerivedTelemetry {
    /// Roll/pitch/yaw in radians
    pub attitude: Option<EulerAngles>,
    /// Horizontal speed, sqrt(vx² + vy²)
    pub ground_speed: Option<f64>,
    /// Linear z velocity
    pub vertical_speed: Option<f64>,
    /// Position z
    pub altitude: Option<f64>,
    /// Angular z velocity
    pub yaw_rate: Option<f64>,
    pub stamp_seconds: Option<f64>,
    pub distance_to_waypoint: Option<f64>,
}

impl DerivedTelemetry {
    pub fn from_message(msg: &OdometryMessage, waypoint: Option<Point>) -> Self {
        let attitude = msg
            .orientation()
            .map(|q| quaternion_to_rpy(q.to_quaternion()))
            .filter(EulerAngles::is_finite);

        let linear = msg.linear_velocity();
        let ground_speed = linear.and_then(|v| Some(ground_speed(v.x?, v.y?)));
        let vertical_speed = linear.and_then(|v| v.z);

        let position = msg.position();
        let altitude = position.and_then(|p| p.z);
        let distance_to_waypoint = position.zip(waypoint).and_then(|(p, wp)| distance(p, wp));

        Self {
            attitude,
            ground_speed,
            vertical_speed,
            altitude,
            yaw_rate: msg.angular_velocity().and_then(|v| v.z),
            stamp_seconds: stamp_to_seconds(msg.header.as_ref()),
            distance_to_waypoint,
        }
    }

    pub fn attitude_degrees(&self) -> Option<EulerAngles> {
        self.attitude.map(EulerAngles::to_degrees)
    }

    pub fn roll_deg(&self) -> Option<f64> {
        self.attitude_degrees().map(|a| a.roll)
    }

    pub fn pitch_deg(&self) -> Option<f64> {
        self.attitude_degrees().map(|a| a.pitch)
    }

    pub fn yaw_deg(&self) -> Option<f64> {
        self.attitude_degrees().map(|a| a.yaw)
    }
}

/// Display strings for every telemetry field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct TelemetryDisplay {
    pub ground_speed: String,
    pub altitude: String,
    pub vertical_speed: String,
    pub roll: String,
    pub pitch: String,
    pub yaw: String,
    pub yaw_rate: String,
    pub stamp: String,
    pub distance_to_waypoint: String,
}

/// Straight-line distance; `None` unless every position component is present
fn distance(position: &Vector3, waypoint: Point) -> Option<f64> {
    let dx = position.x? - waypoint.x;
    let dy = position.y? - waypoint.y;
    let dz = position.z? - waypoint.z;
    Some((dx * dx + dy * dy + dz * dz).sqrt())
}

/// Read-only state exposed to presentation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// Whether samples are currently flowing from a connected bridge
    pub connected: bool,
    pub latest: Option<OdometryMessage>,
    pub derived: DerivedTelemetry,
    pub samples: u64,
    pub waypoint: Option<Point>,
}

impl TelemetrySnapshot {
    /// Replace the latest sample and recompute derived values
    pub fn apply(&mut self, msg: OdometryMessage) {
        self.derived = DerivedTelemetry::from_message(&msg, self.waypoint);
        self.latest = Some(msg);
        self.samples += 1;
    }

    pub fn has_data(&self) -> bool {
        self.latest.is_some()
    }

    pub fn display(&self) -> TelemetryDisplay {
        let d = &self.derived;
        TelemetryDisplay {
            ground_speed: format_value(d.ground_speed),
            altitude: format_value(d.altitude),
            vertical_speed: format_value(d.vertical_speed),
            roll: format_value(d.roll_deg()),
            pitch: format_value(d.pitch_deg()),
            yaw: format_value(d.yaw_deg()),
            yaw_rate: format_value(d.yaw_rate),
            stamp: format_value(d.stamp_seconds),
            distance_to_waypoint: format_value(d.distance_to_waypoint),
        }
    }
}

/// Follows the shared connection and keeps the latest telemetry
pub struct TelemetryViewModel {
    state: Arc<watch::Sender<TelemetrySnapshot>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TelemetryViewModel {
    /// Start following `context`, subscribing to `topic` whenever a connected
    /// bridge is available
    pub fn attach(context: &ConnectionContext, topic: Topic<OdometryMessage>) -> Self {
        let (state, _) = watch::channel(TelemetrySnapshot::default());
        let state = Arc::new(state);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Self::binding_task(
            context.watch(),
            topic,
            Arc::clone(&state),
            cancel.clone(),
        ));

        Self { state, cancel, task: Some(task) }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.state.borrow().clone()
    }

    pub fn display(&self) -> TelemetryDisplay {
        self.state.borrow().display()
    }

    pub fn watch(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.state.subscribe()
    }

    /// Snapshots as they change, at most `rate` per second
    ///
    /// Uses latest-wins semantics: a slow consumer sees the newest snapshot,
    /// not a backlog.
    pub fn updates(&self, rate: UpdateRate) -> BoxStream<'static, TelemetrySnapshot> {
        let snapshots = WatchStream::new(self.watch());
        match rate.throttle_interval() {
            None => snapshots.boxed(),
            Some(interval) => snapshots.throttle(interval).boxed(),
        }
    }

    /// Set or clear the waypoint used for distance-to-waypoint
    pub fn set_waypoint(&self, waypoint: Option<Point>) {
        self.state.send_modify(|s| {
            s.waypoint = waypoint;
            if let Some(msg) = &s.latest {
                s.derived = DerivedTelemetry::from_message(msg, waypoint);
            }
        });
    }

    /// Stop following the context and release the subscription
    pub async fn detach(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    async fn binding_task(
        mut link: watch::Receiver<LinkState>,
        topic: Topic<OdometryMessage>,
        state: Arc<watch::Sender<TelemetrySnapshot>>,
        cancel: CancellationToken,
    ) {
        // At most one subscription per view; the old one is always released
        // before a new one is created
        let mut subscription: Option<Subscription> = None;
        let mut bound_to: Option<u64> = None;

        loop {
            let current = link.borrow_and_update().clone();
            match current.live_connection() {
                Some(connection) if bound_to == Some(connection.id()) => {}
                Some(connection) => {
                    if let Some(mut old) = subscription.take() {
                        old.unsubscribe();
                    }
                    let sink = Arc::clone(&state);
                    subscription = Some(subscribe(
                        Some(connection),
                        topic.clone(),
                        move |msg: OdometryMessage| sink.send_modify(|s| s.apply(msg)),
                    ));
                    bound_to = Some(connection.id());
                    info!(
                        topic = %topic.name(),
                        connection_id = connection.id(),
                        "Telemetry following bridge"
                    );
                }
                None => {
                    if let Some(mut old) = subscription.take() {
                        old.unsubscribe();
                        info!(topic = %topic.name(), "Bridge gone; telemetry frozen at last sample");
                    }
                    bound_to = None;
                }
            }

            let connected = bound_to.is_some();
            state.send_if_modified(|s| {
                let changed = s.connected != connected;
                s.connected = connected;
                changed
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = link.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!(topic = %topic.name(), "Telemetry binding ended");
    }
}

impl Drop for TelemetryViewModel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
