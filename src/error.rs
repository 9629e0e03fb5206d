//! Error types for bridge and telemetry processing.
//!
//! All errors implement the `std::error::Error` trait and carry enough context
//! to tell an operator what went wrong and what to try next.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: The bridge socket could not be established
//! - **Transport Errors**: The socket failed mid-session
//! - **Protocol Errors**: A frame from the bridge was not valid rosbridge JSON
//! - **Decode Errors**: A message did not fit its declared message type
//! - **Config Errors**: Configuration files could not be read or parsed
//!
//! Subscribing on a dead connection and tearing a subscription down are not
//! errors at all; see [`crate::subscription`].
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use groundlink::BridgeError;
//!
//! let error = BridgeError::connection_failed("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Invalid bridge URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to connect to bridge: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Bridge transport error: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Protocol error: {details}")]
    Protocol { details: String },

    #[error("Failed to decode message on '{topic}': {details}")]
    Decode { topic: String, details: String },

    #[error("Config file error: {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {details}")]
    ConfigParse { details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Bridge connection is closed")]
    Closed,
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Connection { .. } => true,
            BridgeError::Transport { .. } => true,
            BridgeError::Timeout { .. } => true,
            BridgeError::Closed => true,
            BridgeError::InvalidUrl { .. } => false,
            BridgeError::Protocol { .. } => false,
            BridgeError::Decode { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::ConfigParse { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::InvalidUrl { .. } => vec![
                "Use a ws:// or wss:// URL",
                "Include the bridge port (rosbridge defaults to 9090)",
            ],
            BridgeError::Connection { .. } => vec![
                "Ensure rosbridge_server is running",
                "Check the bridge host and port are reachable",
                "Verify no proxy is blocking WebSocket upgrades",
            ],
            BridgeError::Transport { .. } => vec![
                "Check the network link to the vehicle",
                "Reconnect once the bridge is reachable again",
            ],
            BridgeError::Protocol { .. } => vec![
                "Verify the endpoint is a rosbridge v2 server",
                "Check the bridge protocol version",
            ],
            BridgeError::Decode { .. } => vec![
                "Check the declared message type matches the topic",
                "Try the legacy message type tags for older bridges",
            ],
            BridgeError::Config { .. } => vec![
                "Check the config file exists and is readable",
                "Check file permissions",
            ],
            BridgeError::ConfigParse { .. } => vec![
                "Check the YAML syntax of the config file",
                "Remove unknown keys or fix value types",
            ],
            BridgeError::Timeout { .. } => vec![
                "Increase the shutdown timeout",
                "Check the bridge is responding",
            ],
            BridgeError::Closed => vec![
                "Open a new connection through the connection manager",
            ],
        }
    }

    /// Helper constructor for invalid endpoint URLs.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::InvalidUrl { url: url.into(), reason: reason.into() }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        BridgeError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for mid-session transport errors.
    pub fn transport_error(
        reason: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BridgeError::Transport { reason: reason.into(), source }
    }

    /// Helper constructor for protocol errors.
    pub fn protocol_error(details: impl Into<String>) -> Self {
        BridgeError::Protocol { details: details.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode_error(topic: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Decode { topic: topic.into(), details: details.into() }
    }

    /// Helper constructor for config file errors with path context.
    pub fn config_error(path: PathBuf, source: std::io::Error) -> Self {
        BridgeError::Config { path, source }
    }
}

impl From<serde_yaml_ng::Error> for BridgeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        BridgeError::ConfigParse { details: err.to_string() }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol { details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            topic in "[a-z_/]+",
            details in ".*",
            url in "[a-z:/0-9.]*"
          ) {
            let connection_error = BridgeError::connection_failed(reason.clone());
            let decode_error = BridgeError::decode_error(topic.clone(), details.clone());
            let url_error = BridgeError::invalid_url(url.clone(), reason.clone());

            prop_assert!(connection_error.to_string().contains(&reason));
            prop_assert!(decode_error.to_string().contains(&topic));
            prop_assert!(decode_error.to_string().contains(&details));
            prop_assert!(url_error.to_string().contains(&url));
          }

          #[test]
          fn source_chain_preserves_base_message(base_message in ".*") {
            let source: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            let error = BridgeError::connection_failed_with_source("refused", source);

            let inner = std::error::Error::source(&error);
            prop_assert!(inner.is_some());
            prop_assert_eq!(inner.map(|e| e.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn error_constructors_validation() {
        let config_error = BridgeError::config_error(
            PathBuf::from("/etc/groundlink.yaml"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(config_error, BridgeError::Config { .. }));

        let transport_error = BridgeError::transport_error("reset by peer", None);
        assert!(matches!(transport_error, BridgeError::Transport { .. }));

        let protocol_error = BridgeError::protocol_error("not json");
        assert!(matches!(protocol_error, BridgeError::Protocol { .. }));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BridgeError>();

        let error = BridgeError::Closed;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let connection_error = BridgeError::connection_failed("refused");
        let url_error = BridgeError::invalid_url("http://x", "scheme");

        assert!(connection_error.is_retryable());
        assert!(!url_error.is_retryable());

        for error in [connection_error, url_error, BridgeError::Closed] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn from_conversions_work() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BridgeError = json_err.into();
        assert!(matches!(err, BridgeError::Protocol { .. }));

        let yaml_err = serde_yaml_ng::from_str::<Vec<u32>>("- [unclosed").unwrap_err();
        let err: BridgeError = yaml_err.into();
        assert!(matches!(err, BridgeError::ConfigParse { .. }));
    }
}
