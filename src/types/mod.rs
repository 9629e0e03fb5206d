//! Core types for bridge telemetry.
//!
//! - [`OdometryMessage`] and its parts mirror the `nav_msgs/Odometry` JSON
//!   that rosbridge publishes, with every numeric field optional
//! - [`ConnectionStatus`] is the connection lifecycle state
//! - [`UpdateRate`] controls bridge-side and client-side throttling

mod odometry;
mod status;
mod update_rate;

pub use odometry::{
    DEFAULT_ODOMETRY_TOPIC, Header, LEGACY_ODOMETRY_TYPE, ODOMETRY_TYPE, OdometryMessage, Pose,
    PoseWithCovariance, QuaternionMsg, Time, Twist, TwistWithCovariance, Vector3,
};
pub use status::ConnectionStatus;
pub use update_rate::UpdateRate;
