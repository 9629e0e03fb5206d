//! Connection status reported by the bridge driver

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a bridge connection
///
/// `Connecting -> Connected -> Disconnected`, with `Errored` reachable from
/// either live state when the transport fails. There is no automatic
/// reconnect; a new connection must be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionStatus {
    /// Only `Connected` can carry subscriptions
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// No further transitions happen after a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Errored)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Errored => "errored",
        };
        f.write_str(label)
    }
}
