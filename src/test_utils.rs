//! Test utilities shared by unit tests, integration tests and benches
//!
//! Hidden from the docs; not part of the supported API.

use std::f64::consts::FRAC_1_SQRT_2;
use std::future::Future;
use std::time::Duration;

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Default deadline for [`wait_until`] in lifecycle tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Install a test-writer subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("groundlink=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds or [`TEST_TIMEOUT`] passes
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) -> bool {
    tokio::time::timeout(TEST_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

/// Await `future` with [`TEST_TIMEOUT`], panicking with `what` on expiry
pub async fn within<T>(what: &str, future: impl Future<Output = T>) -> T {
    match tokio::time::timeout(TEST_TIMEOUT, future).await {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for {}", what),
    }
}

/// Builder for rosbridge odometry payloads as they appear on the wire
#[derive(Debug, Clone)]
pub struct OdometrySample {
    sec: i64,
    nanosec: i64,
    position: [f64; 3],
    orientation: [f64; 4],
    linear: [f64; 3],
    angular: [f64; 3],
}

impl Default for OdometrySample {
    fn default() -> Self {
        Self {
            sec: 1_700_000_000,
            nanosec: 0,
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            linear: [0.0; 3],
            angular: [0.0; 3],
        }
    }
}

impl OdometrySample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(mut self, sec: i64, nanosec: i64) -> Self {
        self.sec = sec;
        self.nanosec = nanosec;
        self
    }

    pub fn position(mut self, x: f64, y: f64, z: f64) -> Self {
        self.position = [x, y, z];
        self
    }

    pub fn orientation(mut self, x: f64, y: f64, z: f64, w: f64) -> Self {
        self.orientation = [x, y, z, w];
        self
    }

    /// Level flight heading 90° (yaw = π/2)
    pub fn facing_east(self) -> Self {
        self.orientation(0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2)
    }

    pub fn linear(mut self, x: f64, y: f64, z: f64) -> Self {
        self.linear = [x, y, z];
        self
    }

    pub fn angular(mut self, x: f64, y: f64, z: f64) -> Self {
        self.angular = [x, y, z];
        self
    }

    pub fn to_json(&self) -> Value {
        let [px, py, pz] = self.position;
        let [qx, qy, qz, qw] = self.orientation;
        let [vx, vy, vz] = self.linear;
        let [wx, wy, wz] = self.angular;
        json!({
            "header": {
                "stamp": { "sec": self.sec, "nanosec": self.nanosec },
                "frame_id": "odom"
            },
            "child_frame_id": "base_link",
            "pose": {
                "pose": {
                    "position": { "x": px, "y": py, "z": pz },
                    "orientation": { "x": qx, "y": qy, "z": qz, "w": qw }
                },
                "covariance": vec![0.0; 36]
            },
            "twist": {
                "twist": {
                    "linear": { "x": vx, "y": vy, "z": vz },
                    "angular": { "x": wx, "y": wy, "z": wz }
                },
                "covariance": vec![0.0; 36]
            }
        })
    }
}
