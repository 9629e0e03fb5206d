//! Odometry message schema as delivered by rosbridge
//!
//! Every numeric field is optional. Bridges drop fields, older bridges use
//! different names for stamp fields, and a malformed value must only blank
//! the field it sits in, never the whole sample.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Wire type tag for odometry on ROS 2 bridges
pub const ODOMETRY_TYPE: &str = "nav_msgs/msg/Odometry";

/// Wire type tag for odometry on legacy (ROS 1) bridges
pub const LEGACY_ODOMETRY_TYPE: &str = "nav_msgs/Odometry";

/// Default odometry stream published by MAVROS
pub const DEFAULT_ODOMETRY_TOPIC: &str = "mavros/local_position/odom";

/// Stamp as seconds and nanoseconds
///
/// Kept as floating point: some bridges encode stamps as JSON floats
/// (`12.0`), and any numeric value counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Time {
    #[serde(default, alias = "secs", deserialize_with = "lenient_f64")]
    pub sec: Option<f64>,
    #[serde(default, alias = "nsecs", deserialize_with = "lenient_f64")]
    pub nanosec: Option<f64>,
}

/// `std_msgs/Header`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub stamp: Option<Time>,
    #[serde(default)]
    pub frame_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z: Option<f64>,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x: Some(x), y: Some(y), z: Some(z) }
    }
}

/// Orientation as it appears on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuaternionMsg {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub w: Option<f64>,
}

impl QuaternionMsg {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x: Some(x), y: Some(y), z: Some(z), w: Some(w) }
    }

    /// Convert to the numeric form, substituting NaN for absent components
    pub fn to_quaternion(&self) -> crate::conversions::Quaternion {
        crate::conversions::Quaternion {
            x: self.x.unwrap_or(f64::NAN),
            y: self.y.unwrap_or(f64::NAN),
            z: self.z.unwrap_or(f64::NAN),
            w: self.w.unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub position: Option<Vector3>,
    #[serde(default)]
    pub orientation: Option<QuaternionMsg>,
}

/// `geometry_msgs/PoseWithCovariance` (covariance is not consumed)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseWithCovariance {
    #[serde(default)]
    pub pose: Option<Pose>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    #[serde(default)]
    pub linear: Option<Vector3>,
    #[serde(default)]
    pub angular: Option<Vector3>,
}

/// `geometry_msgs/TwistWithCovariance` (covariance is not consumed)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwistWithCovariance {
    #[serde(default)]
    pub twist: Option<Twist>,
}

/// One decoded `nav_msgs/Odometry` sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdometryMessage {
    #[serde(default)]
    pub header: Option<Header>,
    #[serde(default)]
    pub child_frame_id: Option<String>,
    #[serde(default)]
    pub pose: Option<PoseWithCovariance>,
    #[serde(default)]
    pub twist: Option<TwistWithCovariance>,
}

impl OdometryMessage {
    pub fn position(&self) -> Option<&Vector3> {
        self.pose.as_ref()?.pose.as_ref()?.position.as_ref()
    }

    pub fn orientation(&self) -> Option<&QuaternionMsg> {
        self.pose.as_ref()?.pose.as_ref()?.orientation.as_ref()
    }

    pub fn linear_velocity(&self) -> Option<&Vector3> {
        self.twist.as_ref()?.twist.as_ref()?.linear.as_ref()
    }

    pub fn angular_velocity(&self) -> Option<&Vector3> {
        self.twist.as_ref()?.twist.as_ref()?.angular.as_ref()
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_ros2_sample() {
        let msg: OdometryMessage = serde_json::from_value(json!({
            "header": { "stamp": { "sec": 12, "nanosec": 500000000 }, "frame_id": "map" },
            "child_frame_id": "base_link",
            "pose": { "pose": {
                "position": { "x": 1.0, "y": 2.0, "z": 3.5 },
                "orientation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 }
            }, "covariance": [0.0] },
            "twist": { "twist": {
                "linear": { "x": 3.0, "y": 4.0, "z": -0.5 },
                "angular": { "x": 0.0, "y": 0.0, "z": 0.1 }
            } }
        }))
        .unwrap();

        assert_eq!(msg.child_frame_id.as_deref(), Some("base_link"));
        assert_eq!(msg.position().and_then(|p| p.z), Some(3.5));
        assert_eq!(msg.orientation().and_then(|q| q.w), Some(1.0));
        assert_eq!(msg.linear_velocity().and_then(|v| v.y), Some(4.0));
        assert_eq!(msg.angular_velocity().and_then(|v| v.z), Some(0.1));
        let stamp = msg.header.and_then(|h| h.stamp).unwrap();
        assert_eq!(stamp.sec, Some(12.0));
        assert_eq!(stamp.nanosec, Some(500_000_000.0));
    }

    #[test]
    fn legacy_stamp_field_names_are_accepted() {
        let header: Header =
            serde_json::from_value(json!({ "stamp": { "secs": 7, "nsecs": 25 } })).unwrap();
        let stamp = header.stamp.unwrap();
        assert_eq!(stamp.sec, Some(7.0));
        assert_eq!(stamp.nanosec, Some(25.0));
    }

    #[test]
    fn float_encoded_stamp_is_numeric() {
        let header: Header =
            serde_json::from_value(json!({ "stamp": { "sec": 12.0, "nanosec": 500000000.0 } }))
                .unwrap();
        let stamp = header.stamp.unwrap();
        assert_eq!(stamp.sec, Some(12.0));
        assert_eq!(stamp.nanosec, Some(500_000_000.0));
        let secs = crate::conversions::stamp_to_seconds(Some(&header)).unwrap();
        assert!((secs - 12.5).abs() < 1e-9);
    }

    #[test]
    fn non_numeric_fields_degrade_to_absent() {
        let msg: OdometryMessage = serde_json::from_value(json!({
            "header": { "stamp": { "sec": "soon" } },
            "twist": { "twist": { "linear": { "x": "fast", "y": 1.0, "z": null } } }
        }))
        .unwrap();

        let linear = msg.linear_velocity().unwrap();
        assert_eq!(linear.x, None);
        assert_eq!(linear.y, Some(1.0));
        assert_eq!(linear.z, None);
        assert_eq!(msg.header.as_ref().and_then(|h| h.stamp).and_then(|s| s.sec), None);
        assert!(msg.orientation().is_none());
    }

    #[test]
    fn empty_object_is_an_empty_sample() {
        let msg: OdometryMessage = serde_json::from_value(json!({})).unwrap();
        assert_eq!(msg, OdometryMessage::default());
    }

    #[test]
    fn missing_quaternion_components_become_nan() {
        let q = QuaternionMsg { x: Some(0.0), y: None, z: Some(0.0), w: Some(1.0) }.to_quaternion();
        assert!(q.y.is_nan());
        assert_eq!(q.w, 1.0);
    }
}
