//! Text rendering of telemetry snapshots
//!
//! Stateless helpers: everything they show comes from the arguments.

use std::fmt::Write;

use crate::telemetry::TelemetrySnapshot;
use crate::types::ConnectionStatus;

pub fn status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Disconnected => "Disconnected",
        ConnectionStatus::Connecting => "Connecting...",
        ConnectionStatus::Connected => "Connected",
        ConnectionStatus::Errored => "Connection error",
    }
}

pub fn link_label(connected: bool) -> &'static str {
    if connected { "LINK UP" } else { "LINK DOWN" }
}

/// Label/value pairs in display order
pub fn telemetry_rows(snapshot: &TelemetrySnapshot) -> Vec<(&'static str, String)> {
    let display = snapshot.display();
    let mut rows = vec![
        ("Ground speed (m/s)", display.ground_speed),
        ("Altitude (m)", display.altitude),
        ("Vertical speed (m/s)", display.vertical_speed),
        ("Roll (deg)", display.roll),
        ("Pitch (deg)", display.pitch),
        ("Yaw (deg)", display.yaw),
        ("Yaw rate (rad/s)", display.yaw_rate),
        ("Stamp (s)", display.stamp),
    ];
    if snapshot.waypoint.is_some() {
        rows.push(("Waypoint distance (m)", display.distance_to_waypoint));
    }
    rows
}

/// Multi-line panel with the link state header and one row per value
pub fn render_panel(snapshot: &TelemetrySnapshot) -> String {
    let rows = telemetry_rows(snapshot);
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "[{}] samples: {}", link_label(snapshot.connected), snapshot.samples);
    for (label, value) in rows {
        let _ = writeln!(out, "{:<width$}  {:>12}", label, value, width = width);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{NO_DATA, Point};
    use crate::types::{OdometryMessage, Pose, PoseWithCovariance, Vector3};

    #[test]
    fn labels_cover_every_status() {
        assert_eq!(status_label(ConnectionStatus::Connected), "Connected");
        assert_eq!(status_label(ConnectionStatus::Errored), "Connection error");
        assert_eq!(link_label(false), "LINK DOWN");
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let rows = telemetry_rows(&TelemetrySnapshot::default());
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|(_, value)| value == NO_DATA));

        let panel = render_panel(&TelemetrySnapshot::default());
        assert!(panel.starts_with("[LINK DOWN] samples: 0"));
    }

    #[test]
    fn waypoint_row_only_when_set() {
        let mut snapshot = TelemetrySnapshot { waypoint: Some(Point::default()), ..Default::default() };
        snapshot.apply(OdometryMessage {
            pose: Some(PoseWithCovariance {
                pose: Some(Pose { position: Some(Vector3::new(3.0, 4.0, 0.0)), orientation: None }),
            }),
            ..Default::default()
        });

        let rows = telemetry_rows(&snapshot);
        assert_eq!(rows.last(), Some(&("Waypoint distance (m)", "5.000".to_string())));
        assert!(render_panel(&snapshot).contains("Altitude (m)"));
    }
}
