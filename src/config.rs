//! Bridge configuration
//!
//! Loaded from YAML at application start. Every key is optional; missing keys
//! fall back to a local rosbridge and the MAVROS odometry stream.
//!
//! ```yaml
//! url: ws://192.168.1.20:9090
//! domain_id: "7"
//! topic: uav1/mavros/local_position/odom
//! legacy_type_tags: false
//! throttle: !Max 20
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::subscription::Topic;
use crate::types::{
    DEFAULT_ODOMETRY_TOPIC, LEGACY_ODOMETRY_TYPE, ODOMETRY_TYPE, OdometryMessage, UpdateRate,
};
use crate::{BridgeError, Result};

pub const DEFAULT_BRIDGE_URL: &str = "ws://localhost:9090";

/// Connection and stream settings for one bridge session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// WebSocket endpoint of the rosbridge server
    pub url: String,

    /// Opaque namespace token, passed through unchanged
    pub domain_id: Option<String>,

    /// Odometry stream name
    pub topic: String,

    /// Explicit message type tag; derived from `legacy_type_tags` when unset
    pub message_type: Option<String>,

    /// Use ROS 1 style type tags (`nav_msgs/Odometry`) for older bridges
    pub legacy_type_tags: bool,

    /// Messages the bridge may buffer for us before dropping
    pub queue_length: usize,

    /// Bridge-side throttling
    pub throttle: UpdateRate,

    /// Upper bound on waiting for a socket to close during teardown
    pub shutdown_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BRIDGE_URL.to_string(),
            domain_id: None,
            topic: DEFAULT_ODOMETRY_TOPIC.to_string(),
            message_type: None,
            legacy_type_tags: false,
            queue_length: 1,
            throttle: UpdateRate::Native,
            shutdown_timeout_ms: 2_000,
        }
    }
}

impl BridgeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Parse a YAML document; absent keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the endpoint is a usable WebSocket URL
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| BridgeError::invalid_url(&self.url, e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(BridgeError::invalid_url(
                    &self.url,
                    format!("unsupported scheme '{}'", other),
                ));
            }
        }
        if url.host_str().is_none() {
            return Err(BridgeError::invalid_url(&self.url, "missing host"));
        }
        if self.queue_length == 0 {
            return Err(BridgeError::ConfigParse {
                details: "queue_length must be at least 1".to_string(),
            });
        }
        Ok(url)
    }

    /// Type tag sent in the subscribe request
    pub fn odometry_type(&self) -> &str {
        match &self.message_type {
            Some(tag) => tag.as_str(),
            None if self.legacy_type_tags => LEGACY_ODOMETRY_TYPE,
            None => ODOMETRY_TYPE,
        }
    }

    pub fn odometry_topic(&self) -> Topic<OdometryMessage> {
        Topic::new(self.topic.clone(), self.odometry_type())
            .with_queue_length(self.queue_length)
            .with_throttle(self.throttle)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_target_local_mavros() {
        let config = BridgeConfig::default();
        assert_eq!(config.url, "ws://localhost:9090");
        assert_eq!(config.topic, "mavros/local_position/odom");
        assert_eq!(config.odometry_type(), "nav_msgs/msg/Odometry");
        assert_eq!(config.queue_length, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = BridgeConfig::from_yaml_str("url: ws://10.0.0.2:9090\ndomain_id: '3'\n")
            .unwrap();
        assert_eq!(config.url, "ws://10.0.0.2:9090");
        assert_eq!(config.domain_id.as_deref(), Some("3"));
        assert_eq!(config.topic, DEFAULT_ODOMETRY_TOPIC);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(BridgeConfig::from_yaml_str("  \n").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn legacy_tags_switch_type() {
        let config = BridgeConfig::from_yaml_str("legacy_type_tags: true").unwrap();
        assert_eq!(config.odometry_type(), LEGACY_ODOMETRY_TYPE);

        let explicit = BridgeConfig {
            message_type: Some("custom_msgs/Odom".to_string()),
            legacy_type_tags: true,
            ..BridgeConfig::default()
        };
        assert_eq!(explicit.odometry_type(), "custom_msgs/Odom");
    }

    #[test]
    fn throttle_parses_from_yaml() {
        let config = BridgeConfig::from_yaml_str("throttle: !Max 20").unwrap();
        assert_eq!(config.throttle, UpdateRate::Max(20));
        assert_eq!(config.odometry_topic().throttle_rate(), 50);
    }

    #[test]
    fn non_websocket_urls_are_rejected() {
        let err = BridgeConfig::new("http://localhost:9090").validate().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidUrl { .. }));

        let err = BridgeConfig::new("not a url").validate().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidUrl { .. }));

        assert!(BridgeConfig::from_yaml_str("url: ftp://example.com").is_err());
    }

    #[test]
    fn zero_queue_length_is_rejected() {
        assert!(BridgeConfig::from_yaml_str("queue_length: 0").is_err());
    }

    #[test]
    fn unparseable_yaml_is_config_parse_error() {
        let err = BridgeConfig::from_yaml_str("url: [unclosed").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigParse { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url: wss://bridge.example.com/ros").unwrap();
        writeln!(file, "topic: uav2/mavros/local_position/odom").unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.url, "wss://bridge.example.com/ros");
        assert_eq!(config.topic, "uav2/mavros/local_position/odom");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BridgeConfig::from_file("/nonexistent/groundlink.yaml").unwrap_err();
        match err {
            BridgeError::Config { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/groundlink.yaml"))
            }
            other => panic!("Expected Config error, got {:?}", other),
        }
    }
}
