//! Automatic tilt-bias calibration
//!
//! Camera heads are rarely mounted perfectly level. The calibrator watches the
//! raw tilt while the rig settles and takes the median of a sampling window as
//! the bias to subtract from every later reading.
//!
//! # Timeline
//!
//! ```text
//! first packet                         window_start + 3s          window_start + 8s
//!      │◄────────────── Settling ──────────────►│◄──── Collecting ─────►│
//!      │        (samples ignored)               │   (samples buffered)  │ offset = median
//! ```
//!
//! After the window closes the calibrator returns to `Idle`, so the next packet
//! opens a fresh window. In one-shot mode it stays `Complete` until [`reset`].
//!
//! [`reset`]: TiltCalibrator::reset

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tilt calibration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Run automatic calibration
    pub enabled: bool,
    /// Seconds to wait after the first packet before sampling
    pub settle_secs: f64,
    /// Length of the sampling window in seconds
    pub collect_secs: f64,
    /// Stop after the first completed window instead of re-arming
    pub one_shot: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_secs: 3.0,
            collect_secs: 5.0,
            one_shot: false,
        }
    }
}

/// Calibrator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// No window open
    Idle,
    /// Window opened, waiting for the rig to settle
    Settling { window_start: Instant },
    /// Buffering raw tilt samples
    Collecting { window_start: Instant },
    /// Offset fixed (one-shot window finished or offset forced)
    Complete,
}

/// Median-window tilt bias estimator
#[derive(Debug, Clone)]
pub struct TiltCalibrator {
    config: CalibrationConfig,
    settle: Duration,
    window: Duration,
    phase: CalibrationPhase,
    samples: Vec<f64>,
    offset: f64,
    windows_completed: u64,
}

impl TiltCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        let settle = secs(config.settle_secs);
        let window = settle.saturating_add(secs(config.collect_secs));
        Self {
            config,
            settle,
            window,
            phase: CalibrationPhase::Idle,
            samples: Vec::new(),
            offset: 0.0,
            windows_completed: 0,
        }
    }

    /// Feed one raw tilt reading (degrees, before bias correction).
    ///
    /// Returns the new offset only on the packet that closes a window.
    pub fn observe(&mut self, raw_tilt_deg: f64, now: Instant) -> Option<f64> {
        if !self.config.enabled {
            return None;
        }

        match self.phase {
            CalibrationPhase::Idle => {
                self.phase = CalibrationPhase::Settling { window_start: now };
                log::debug!("Tilt calibration: window opened, settling");
                None
            }
            CalibrationPhase::Settling { window_start } => {
                if now.saturating_duration_since(window_start) > self.settle {
                    self.samples.clear();
                    self.phase = CalibrationPhase::Collecting { window_start };
                    log::info!("Tilt calibration: starting capture window");
                }
                None
            }
            CalibrationPhase::Collecting { window_start } => {
                self.samples.push(raw_tilt_deg);
                if now.saturating_duration_since(window_start) <= self.window {
                    return None;
                }
                self.close_window()
            }
            CalibrationPhase::Complete => None,
        }
    }

    fn close_window(&mut self) -> Option<f64> {
        let median = median(&self.samples);
        let count = self.samples.len();
        self.samples.clear();
        self.phase = if self.config.one_shot {
            CalibrationPhase::Complete
        } else {
            CalibrationPhase::Idle
        };

        match median {
            Some(offset) => {
                self.offset = offset;
                self.windows_completed += 1;
                log::info!(
                    "Tilt calibration: median offset set to {:.2}° from {} samples",
                    offset,
                    count
                );
                Some(offset)
            }
            None => {
                log::warn!("Tilt calibration: window closed without samples, keeping offset");
                None
            }
        }
    }

    /// Clear the offset and start over on the next packet
    pub fn reset(&mut self) {
        self.phase = CalibrationPhase::Idle;
        self.samples.clear();
        self.offset = 0.0;
        log::info!("Tilt calibration reset");
    }

    /// Pin the offset to a known value; automatic windows stop until [`reset`](Self::reset)
    pub fn force_offset(&mut self, offset_deg: f64) {
        self.offset = offset_deg;
        self.samples.clear();
        self.phase = CalibrationPhase::Complete;
        log::info!("Tilt calibration: offset forced to {:.2}°", offset_deg);
    }

    /// Current bias in degrees
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Collecting { .. })
    }

    /// Samples buffered in the open window
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn windows_completed(&self) -> u64 {
        self.windows_completed
    }
}

/// Non-finite or negative durations saturate instead of panicking
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Upper median: element `len / 2` of the sorted samples
fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}
