//! Network-facing FreeD receiver

pub mod stats;
pub mod udp_receiver;

pub use stats::{ReceiverStats, StatsSnapshot};
pub use udp_receiver::{ReceiverHandle, TelemetryReceiver};
