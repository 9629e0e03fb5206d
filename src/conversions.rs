//! Orientation and time conversions
//!
//! Pure functions with no shared state. Nothing here fails: malformed input
//! comes back as NaN or `None`, and callers render that as "no data".

use serde::{Deserialize, Serialize};

use crate::types::Header;

/// Orientation quaternion, not necessarily normalized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

/// Roll, pitch and yaw in radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    /// False when any angle is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite() && self.pitch.is_finite() && self.yaw.is_finite()
    }

    pub fn to_degrees(self) -> EulerAngles {
        EulerAngles {
            roll: self.roll.to_degrees(),
            pitch: self.pitch.to_degrees(),
            yaw: self.yaw.to_degrees(),
        }
    }
}

/// Convert a quaternion to roll/pitch/yaw (aerospace ZYX convention)
///
/// The pitch argument is clamped to `[-1, 1]` before `asin`, so a slightly
/// denormalized quaternion yields ±π/2 instead of NaN.
pub fn quaternion_to_rpy(q: Quaternion) -> EulerAngles {
    let Quaternion { x, y, z, w } = q;

    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    // f64::clamp passes NaN through untouched
    let sinp = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = sinp.asin();

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    EulerAngles { roll, pitch, yaw }
}

/// Collapse a header stamp into floating-point seconds
///
/// Returns `None` when the header, its stamp, or `stamp.sec` is missing.
/// A missing `nanosec` counts as zero.
pub fn stamp_to_seconds(header: Option<&Header>) -> Option<f64> {
    let stamp = header?.stamp?;
    let sec = stamp.sec?;
    let nanosec = stamp.nanosec.unwrap_or(0.0);
    Some(sec + nanosec * 1e-9)
}

/// Horizontal speed from planar velocity components
pub fn ground_speed(vx: f64, vy: f64) -> f64 {
    vx.hypot(vy)
}
