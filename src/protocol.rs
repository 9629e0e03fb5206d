//! rosbridge v2 wire operations
//!
//! Only the operations a read-only telemetry client needs are modelled:
//! `subscribe` and `unsubscribe` going out, `publish` and `status` coming in.
//! Anything else the bridge sends decodes as [`BridgeOp::Unknown`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// One rosbridge JSON operation, tagged by its `op` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeOp {
    Subscribe {
        id: String,
        topic: String,
        #[serde(rename = "type")]
        message_type: String,
        queue_length: usize,
        throttle_rate: u64,
    },
    Unsubscribe {
        id: String,
        topic: String,
    },
    Publish {
        topic: String,
        msg: Value,
    },
    Status {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        level: Option<String>,
        #[serde(default)]
        msg: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl BridgeOp {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_uses_rosbridge_field_names() {
        let op = BridgeOp::Subscribe {
            id: "subscribe:odom:1".to_string(),
            topic: "mavros/local_position/odom".to_string(),
            message_type: "nav_msgs/msg/Odometry".to_string(),
            queue_length: 1,
            throttle_rate: 0,
        };
        let value: Value = serde_json::from_str(&op.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "op": "subscribe",
                "id": "subscribe:odom:1",
                "topic": "mavros/local_position/odom",
                "type": "nav_msgs/msg/Odometry",
                "queue_length": 1,
                "throttle_rate": 0
            })
        );
    }

    #[test]
    fn publish_decodes_with_payload() {
        let op = BridgeOp::decode(r#"{"op":"publish","topic":"odom","msg":{"pose":{}}}"#).unwrap();
        assert_eq!(op, BridgeOp::Publish { topic: "odom".to_string(), msg: json!({"pose": {}}) });
    }

    #[test]
    fn status_fields_are_optional() {
        let op = BridgeOp::decode(r#"{"op":"status","level":"error","msg":"no such topic"}"#)
            .unwrap();
        assert_eq!(
            op,
            BridgeOp::Status {
                id: None,
                level: Some("error".to_string()),
                msg: Some("no such topic".to_string())
            }
        );
    }

    #[test]
    fn unknown_ops_are_tolerated() {
        let op = BridgeOp::decode(r#"{"op":"png","data":"..."}"#).unwrap();
        assert_eq!(op, BridgeOp::Unknown);
    }

    #[test]
    fn malformed_frames_are_protocol_errors() {
        let err = BridgeOp::decode("not json").unwrap_err();
        assert!(matches!(err, crate::BridgeError::Protocol { .. }));
    }
}
