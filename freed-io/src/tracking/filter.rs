//! Clamp, quantize and smooth decoded telemetry into the camera state
//!
//! # Pipeline
//!
//! ```text
//! tilt_deg - offset ─► clamp ─► quantize ─┐
//! pan_deg ──────────► clamp ─► quantize ─┼─► exponential smoothing ─► CameraState
//! zoom_raw ────────────────────────────────┘        ▲
//!        └──► zoom_ratio ──► tilt gain ──────────────┘
//! ```
//!
//! Tilt gain shrinks as the lens zooms in: at long focal lengths the same
//! mechanical jitter covers more of the frame.
//!
//! Only the *target* is clamped. The smoothed value approaches it over several
//! updates, so a sudden change in tilt offset can leave the published tilt
//! briefly outside the nominal range.

use super::state::CameraState;
use crate::protocol::{FREED_ZOOM_FULL_SCALE, RawTelemetry};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Smoothing and limit parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Pan smoothing gain (0-1, higher = more responsive)
    pub pan_gain: f64,
    /// Zoom smoothing gain, applied to raw encoder units
    pub zoom_gain: f64,
    /// Tilt gain at full wide angle
    pub tilt_gain_wide: f64,
    /// Lower bound for tilt gain at full zoom
    pub tilt_gain_min: f64,
    /// Tilt gain reduction per unit zoom ratio
    pub tilt_gain_zoom_factor: f64,
    pub pan_min: f64,
    pub pan_max: f64,
    pub tilt_min: f64,
    pub tilt_max: f64,
    /// Pan quantization step (degrees)
    pub pan_step: f64,
    /// Tilt quantization step (degrees)
    pub tilt_step: f64,
    /// Raw zoom value mapped to ratio 1.0
    pub zoom_full_scale: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pan_gain: 0.15,
            zoom_gain: 0.15,
            tilt_gain_wide: 0.25,
            tilt_gain_min: 0.05,
            tilt_gain_zoom_factor: 0.20,
            pan_min: -180.0,
            pan_max: 180.0,
            tilt_min: -30.0,
            tilt_max: 90.0,
            pan_step: 0.25,
            tilt_step: 0.5,
            zoom_full_scale: FREED_ZOOM_FULL_SCALE,
        }
    }
}

/// Per-packet smoothing target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTarget {
    /// Clamped, quantized pan (degrees)
    pub pan: f64,
    /// Bias-corrected, clamped, quantized tilt (degrees)
    pub tilt: f64,
    /// Raw zoom (encoder units)
    pub zoom: f64,
    /// Zoom as a fraction of full scale
    pub zoom_ratio: f64,
    /// Tilt gain chosen for this zoom
    pub tilt_gain: f64,
}

/// Stateless smoothing filter; all state lives in [`CameraState`]
#[derive(Debug, Clone, Default)]
pub struct CameraStateFilter {
    config: FilterConfig,
}

impl CameraStateFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Compute the clamped, quantized target for one packet
    pub fn target(&self, telemetry: &RawTelemetry, tilt_offset: f64) -> FilterTarget {
        let c = &self.config;

        let pan = telemetry.pan_deg.clamp(c.pan_min, c.pan_max);
        let tilt = (telemetry.tilt_deg - tilt_offset).clamp(c.tilt_min, c.tilt_max);

        let zoom = telemetry.zoom_raw as f64;
        let zoom_ratio = self.zoom_ratio(zoom);

        FilterTarget {
            pan: quantize(pan, c.pan_step),
            tilt: quantize(tilt, c.tilt_step),
            zoom,
            zoom_ratio,
            tilt_gain: self.tilt_gain(zoom_ratio),
        }
    }

    /// Blend one packet into `state`.
    ///
    /// Callers hold the state lock for the whole call so pan, tilt, zoom and
    /// the timestamp change together.
    pub fn apply(
        &self,
        state: &mut CameraState,
        telemetry: &RawTelemetry,
        tilt_offset: f64,
        now: Instant,
    ) -> FilterTarget {
        let target = self.target(telemetry, tilt_offset);
        let c = &self.config;

        state.pan = smooth(state.pan, target.pan, c.pan_gain);
        state.tilt = smooth(state.tilt, target.tilt, target.tilt_gain);
        state.zoom = smooth(state.zoom, target.zoom, c.zoom_gain);

        if let Some(pos) = telemetry.position {
            state.x = pos.x;
            state.y = pos.y;
            state.z = pos.z;
        }

        state.tilt_offset = tilt_offset;
        state.last_telemetry_at = Some(now);
        state.updates += 1;

        target
    }

    /// Raw zoom as a fraction of full scale, clamped to [0, 1]
    pub fn zoom_ratio(&self, zoom_raw: f64) -> f64 {
        if self.config.zoom_full_scale == 0 {
            return 0.0;
        }
        (zoom_raw / self.config.zoom_full_scale as f64).clamp(0.0, 1.0)
    }

    /// `max(min, wide - ratio * factor)`
    pub fn tilt_gain(&self, zoom_ratio: f64) -> f64 {
        let c = &self.config;
        (c.tilt_gain_wide - zoom_ratio * c.tilt_gain_zoom_factor).max(c.tilt_gain_min)
    }
}

/// Round to the nearest multiple of `step` (ties to even)
#[inline]
fn quantize(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    (value / step).round_ties_even() * step
}

#[inline]
fn smooth(current: f64, target: f64, gain: f64) -> f64 {
    (1.0 - gain) * current + gain * target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Position;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn telemetry(pan_deg: f64, tilt_deg: f64, zoom_raw: u32) -> RawTelemetry {
        RawTelemetry {
            pan_raw: 0,
            tilt_raw: 0,
            zoom_raw,
            pan_deg,
            tilt_deg,
            position: None,
        }
    }

    fn zero_state() -> CameraState {
        let mut state = CameraState::default();
        state.pan = 0.0;
        state.tilt = 0.0;
        state.zoom = 0.0;
        state
    }

    #[test]
    fn test_single_update_scenario() {
        let filter = CameraStateFilter::default();
        let mut state = zero_state();
        let now = Instant::now();

        let target = filter.apply(&mut state, &telemetry(90.0, 30.0, 0x20_0000), 0.0, now);

        assert_relative_eq!(target.zoom_ratio, 0.5);
        assert_relative_eq!(target.tilt_gain, 0.15, epsilon = 1e-12);
        assert_relative_eq!(state.pan, 13.5, epsilon = 1e-9);
        assert_relative_eq!(state.tilt, 4.5, epsilon = 1e-9);
        assert_relative_eq!(state.zoom, 314_572.8, epsilon = 1e-6);
        assert_eq!(state.last_telemetry_at, Some(now));
        assert_eq!(state.updates, 1);
    }

    #[test]
    fn test_converges_without_overshoot() {
        let filter = CameraStateFilter::default();
        let mut state = zero_state();
        let input = telemetry(-47.3, 62.2, 0x30_0000);
        let target = filter.target(&input, 0.0);
        let now = Instant::now();

        let mut prev_gap = (
            (target.pan - state.pan).abs(),
            (target.tilt - state.tilt).abs(),
            (target.zoom - state.zoom).abs(),
        );
        for _ in 0..200 {
            filter.apply(&mut state, &input, 0.0, now);
            let gap = (
                (target.pan - state.pan).abs(),
                (target.tilt - state.tilt).abs(),
                (target.zoom - state.zoom).abs(),
            );
            assert!(gap.0 <= prev_gap.0 && gap.1 <= prev_gap.1 && gap.2 <= prev_gap.2);
            assert!(state.pan >= target.pan, "pan overshot");
            assert!(state.tilt <= target.tilt, "tilt overshot");
            assert!(state.zoom <= target.zoom, "zoom overshot");
            prev_gap = gap;
        }
        assert_abs_diff_eq!(state.pan, target.pan, epsilon = 1e-6);
        assert_abs_diff_eq!(state.tilt, target.tilt, epsilon = 1e-3);
    }

    #[test]
    fn test_quantization_steps() {
        let filter = CameraStateFilter::default();
        for (pan, tilt) in [(12.34, 7.77), (-0.13, -0.26), (179.9, 89.74), (33.376, 1.249)] {
            let target = filter.target(&telemetry(pan, tilt, 0), 0.0);
            assert_eq!((target.pan * 4.0).fract(), 0.0, "pan {}", target.pan);
            assert_eq!((target.tilt * 2.0).fract(), 0.0, "tilt {}", target.tilt);
        }

        let target = filter.target(&telemetry(12.34, 7.77, 0), 0.0);
        assert_eq!(target.pan, 12.25);
        assert_eq!(target.tilt, 8.0);
    }

    #[test]
    fn test_targets_clamped() {
        let filter = CameraStateFilter::default();

        let target = filter.target(&telemetry(250.0, 170.0, 0), 0.0);
        assert_eq!(target.pan, 180.0);
        assert_eq!(target.tilt, 90.0);

        let target = filter.target(&telemetry(-900.0, -80.0, 0), 0.0);
        assert_eq!(target.pan, -180.0);
        assert_eq!(target.tilt, -30.0);
    }

    #[test]
    fn test_offset_subtracted_before_clamp() {
        let filter = CameraStateFilter::default();
        let target = filter.target(&telemetry(0.0, 95.0, 0), 10.0);
        assert_eq!(target.tilt, 85.0);

        let target = filter.target(&telemetry(0.0, -25.0, 0), 10.0);
        assert_eq!(target.tilt, -30.0);
    }

    #[test]
    fn test_tilt_gain_follows_zoom() {
        let filter = CameraStateFilter::default();
        assert_relative_eq!(filter.tilt_gain(0.0), 0.25);
        assert_relative_eq!(filter.tilt_gain(1.0), 0.05, epsilon = 1e-12);

        let target = filter.target(&telemetry(0.0, 0.0, 0xFF_FFFF), 0.0);
        assert_eq!(target.zoom_ratio, 1.0);
        assert_relative_eq!(target.tilt_gain, 0.05, epsilon = 1e-12);

        let floor = CameraStateFilter::new(FilterConfig {
            tilt_gain_zoom_factor: 0.5,
            ..Default::default()
        });
        assert_eq!(floor.tilt_gain(1.0), 0.05);
    }

    #[test]
    fn test_zoom_smoothing_uses_raw_units() {
        let filter = CameraStateFilter::default();
        let mut state = zero_state();
        filter.apply(&mut state, &telemetry(0.0, 0.0, 0x80_0000), 0.0, Instant::now());
        assert_relative_eq!(state.zoom, 0x80_0000 as f64 * 0.15, epsilon = 1e-6);
    }

    #[test]
    fn test_position_replaced_when_present() {
        let filter = CameraStateFilter::default();
        let mut state = zero_state();

        filter.apply(&mut state, &telemetry(0.0, 0.0, 0), 0.0, Instant::now());
        assert_eq!((state.x, state.y, state.z), (0.0, -10.0, 2.0));

        let mut input = telemetry(0.0, 0.0, 0);
        input.position = Some(Position {
            x: 1.0,
            y: -4.5,
            z: 1.8,
        });
        filter.apply(&mut state, &input, 0.0, Instant::now());
        assert_eq!((state.x, state.y, state.z), (1.0, -4.5, 1.8));
    }

    #[test]
    fn test_smoothed_value_may_lag_outside_range() {
        let filter = CameraStateFilter::default();
        let mut state = zero_state();
        state.tilt = 100.0;

        filter.apply(&mut state, &telemetry(0.0, 120.0, 0), 0.0, Instant::now());
        assert!(state.tilt > 90.0);
        assert!(state.tilt < 100.0);
    }
}
