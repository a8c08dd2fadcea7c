//! Shared camera tracker
//!
//! `CameraTracker` is the single owner of everything that changes per packet:
//! the published [`CameraState`], the [`TiltCalibrator`] and the [`IdlePolicy`].
//! It is cheap to clone; the receiver thread holds one clone and writes, any
//! number of consumers hold others and read snapshots.
//!
//! # Locking
//!
//! Each component sits behind its own `parking_lot::Mutex` and locks are never
//! nested. The calibrator lock is released before the state lock is taken, so
//! the offset used by an update is always computed first. Readers copy the
//! state out and drop the lock immediately.

use super::calibration::{CalibrationConfig, CalibrationPhase, TiltCalibrator};
use super::filter::{CameraStateFilter, FilterConfig, FilterTarget};
use super::idle::{IdleConfig, IdlePolicy, IdleStatus};
use super::state::{CameraConfig, CameraState, LensConfig};
use crate::config::AppConfig;
use crate::protocol::RawTelemetry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

struct TrackerInner {
    filter: CameraStateFilter,
    lens: LensConfig,
    state: Mutex<CameraState>,
    calibrator: Mutex<TiltCalibrator>,
    idle: Mutex<IdlePolicy>,
}

/// Thread-safe handle to one camera source
#[derive(Clone)]
pub struct CameraTracker {
    inner: Arc<TrackerInner>,
}

impl CameraTracker {
    pub fn new(
        filter: FilterConfig,
        calibration: CalibrationConfig,
        idle: &IdleConfig,
        camera: &CameraConfig,
        lens: LensConfig,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                filter: CameraStateFilter::new(filter),
                lens,
                state: Mutex::new(CameraState::new(camera)),
                calibrator: Mutex::new(TiltCalibrator::new(calibration)),
                idle: Mutex::new(IdlePolicy::new(idle, Instant::now())),
            }),
        }
    }

    /// Build from the application configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.filter.clone(),
            config.calibration.clone(),
            &config.idle,
            &config.camera,
            config.lens,
        )
    }

    /// Apply one decoded packet: calibrate, then filter into the state.
    pub fn ingest(&self, telemetry: &RawTelemetry, now: Instant) -> FilterTarget {
        let tilt_offset = {
            let mut calibrator = self.inner.calibrator.lock();
            calibrator.observe(telemetry.tilt_deg, now);
            calibrator.offset()
        };

        let target = {
            let mut state = self.inner.state.lock();
            self.inner
                .filter
                .apply(&mut state, telemetry, tilt_offset, now)
        };

        self.inner.idle.lock().mark_telemetry(now);
        target
    }

    /// Consistent copy of the current camera state
    pub fn snapshot(&self) -> CameraState {
        *self.inner.state.lock()
    }

    /// Idle classification with animation phase
    pub fn idle_status(&self, now: Instant) -> IdleStatus {
        let last = self.inner.state.lock().last_telemetry_at;
        self.inner.idle.lock().check(last, now)
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        let last = self.inner.state.lock().last_telemetry_at;
        self.inner.idle.lock().is_idle(last, now)
    }

    /// Drop the learned tilt offset and recalibrate from the next packet
    pub fn reset_calibration(&self) {
        self.inner.calibrator.lock().reset();
    }

    /// Use a fixed tilt offset instead of the automatic estimate
    pub fn force_tilt_offset(&self, offset_deg: f64) {
        self.inner.calibrator.lock().force_offset(offset_deg);
    }

    pub fn tilt_offset(&self) -> f64 {
        self.inner.calibrator.lock().offset()
    }

    pub fn calibration_phase(&self) -> CalibrationPhase {
        self.inner.calibrator.lock().phase()
    }

    pub fn lens(&self) -> &LensConfig {
        &self.inner.lens
    }
}

impl Default for CameraTracker {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
