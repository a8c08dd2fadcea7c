//! Camera tracking: tilt calibration, smoothing filter, idle detection and
//! the shared state they feed

pub mod calibration;
pub mod filter;
pub mod idle;
pub mod state;
pub mod tracker;

pub use calibration::{CalibrationConfig, CalibrationPhase, TiltCalibrator};
pub use filter::{CameraStateFilter, FilterConfig, FilterTarget};
pub use idle::{IdleConfig, IdlePolicy, IdleStatus};
pub use state::{CameraConfig, CameraState, LensConfig};
pub use tracker::CameraTracker;
