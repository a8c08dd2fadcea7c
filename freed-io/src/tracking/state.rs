//! Camera state published to consumers

use crate::protocol::FREED_ZOOM_FULL_SCALE;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Static camera placement used when the profile carries no position
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Meters
    pub x: f64,
    /// Meters (negative = behind the origin)
    pub y: f64,
    /// Meters (eye level)
    pub z: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: -10.0,
            z: 2.0,
        }
    }
}

/// Zoom encoder to field-of-view mapping
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct LensConfig {
    /// Horizontal FoV at zoom 0 (degrees)
    pub wide_fov_deg: f64,
    /// Horizontal FoV at full zoom (degrees)
    pub tele_fov_deg: f64,
    /// Raw zoom value at full telephoto
    pub zoom_full_scale: u32,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            wide_fov_deg: 60.7,
            tele_fov_deg: 3.5,
            zoom_full_scale: FREED_ZOOM_FULL_SCALE,
        }
    }
}

/// Smoothed camera pose.
///
/// Written only by the tracker under its state lock; consumers get copies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Smoothed pan (degrees)
    pub pan: f64,
    /// Smoothed tilt (degrees, bias corrected)
    pub tilt: f64,
    /// Smoothed zoom (raw encoder units)
    pub zoom: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Arrival time of the last applied telemetry, `None` before the first packet
    pub last_telemetry_at: Option<Instant>,
    /// Tilt bias applied by the last update
    pub tilt_offset: f64,
    /// Number of telemetry updates applied
    pub updates: u64,
}

impl CameraState {
    /// Initial state at the configured static position
    pub fn new(camera: &CameraConfig) -> Self {
        Self {
            pan: 0.0,
            tilt: 0.0,
            zoom: 0.0,
            x: camera.x,
            y: camera.y,
            z: camera.z,
            last_telemetry_at: None,
            tilt_offset: 0.0,
            updates: 0,
        }
    }

    /// Smoothed zoom as a fraction of the lens range, clamped to [0, 1]
    pub fn zoom_ratio(&self, lens: &LensConfig) -> f64 {
        if lens.zoom_full_scale == 0 {
            return 0.0;
        }
        (self.zoom / lens.zoom_full_scale as f64).clamp(0.0, 1.0)
    }

    /// Field of view for the current zoom, linear from wide to tele
    pub fn field_of_view_deg(&self, lens: &LensConfig) -> f64 {
        let ratio = self.zoom_ratio(lens);
        lens.wide_fov_deg - ratio * (lens.wide_fov_deg - lens.tele_fov_deg)
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_state() {
        let state = CameraState::default();
        assert_eq!(state.pan, 0.0);
        assert_eq!(state.y, -10.0);
        assert_eq!(state.z, 2.0);
        assert!(state.last_telemetry_at.is_none());
        assert_eq!(state.updates, 0);
    }

    #[test]
    fn test_field_of_view_endpoints() {
        let lens = LensConfig::default();
        let mut state = CameraState::default();
        assert_relative_eq!(state.field_of_view_deg(&lens), 60.7);

        state.zoom = FREED_ZOOM_FULL_SCALE as f64;
        assert_relative_eq!(state.field_of_view_deg(&lens), 3.5);

        state.zoom = FREED_ZOOM_FULL_SCALE as f64 / 2.0;
        assert_relative_eq!(state.field_of_view_deg(&lens), 32.1, epsilon = 1e-9);
    }

    #[test]
    fn test_zoom_ratio_clamped() {
        let lens = LensConfig::default();
        let mut state = CameraState::default();
        state.zoom = 3.0 * FREED_ZOOM_FULL_SCALE as f64;
        assert_eq!(state.zoom_ratio(&lens), 1.0);
        state.zoom = -5.0;
        assert_eq!(state.zoom_ratio(&lens), 0.0);
    }
}
