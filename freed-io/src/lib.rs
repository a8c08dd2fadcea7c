//! FreedIO - FreeD camera-tracking telemetry receiver
//!
//! Decodes FreeD pan/tilt/zoom datagrams and maintains one smoothed,
//! bias-corrected camera state that render loops can poll every frame.
//!
//! ## Layers
//!
//! ```text
//! receiver/   UDP socket thread (only blocking I/O)
//!    │
//! tracking/   tilt calibration, smoothing filter, idle policy, shared state
//!    │
//! protocol/   profile layouts and the pure datagram decoder
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod receiver;
pub mod tracking;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{DecodeError, Error, Result};
pub use protocol::{PacketDecoder, PacketLayout, Profile, RawTelemetry};
pub use receiver::{ReceiverHandle, TelemetryReceiver};
pub use tracking::{CameraState, CameraTracker, IdleStatus};
