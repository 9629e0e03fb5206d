//! Update rate control for telemetry streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for telemetry streams
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum UpdateRate {
    /// Every sample the bridge delivers
    #[default]
    Native,

    /// Throttled to maximum Hz
    /// A rate of zero is treated as Native
    Max(u32),
}

impl UpdateRate {
    /// Check if throttling is needed
    pub fn needs_throttle(self) -> bool {
        matches!(self, UpdateRate::Max(hz) if hz > 0)
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Max(hz) if hz > 0 => Some(Duration::from_secs_f64(1.0 / hz as f64)),
            _ => None,
        }
    }

    /// Minimum spacing between messages in the form rosbridge expects
    /// (`throttle_rate`, milliseconds, 0 = unthrottled)
    pub fn throttle_millis(self) -> u64 {
        self.throttle_interval().map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_is_unthrottled() {
        assert!(!UpdateRate::Native.needs_throttle());
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Native.throttle_millis(), 0);
    }

    #[test]
    fn max_rate_maps_to_interval() {
        assert!(UpdateRate::Max(10).needs_throttle());
        assert_eq!(UpdateRate::Max(10).throttle_interval(), Some(Duration::from_millis(100)));
        assert_eq!(UpdateRate::Max(4).throttle_millis(), 250);
    }

    #[test]
    fn zero_hz_behaves_like_native() {
        assert!(!UpdateRate::Max(0).needs_throttle());
        assert_eq!(UpdateRate::Max(0).throttle_millis(), 0);
    }
}
