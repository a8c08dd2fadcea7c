//! UDP receiver for FreeD telemetry
//!
//! Receives FreeD datagrams on a dedicated thread, decodes them and feeds the
//! shared [`CameraTracker`]. Consumers never talk to the socket; they read
//! tracker snapshots at their own rate.
//!
//! # Loop
//!
//! ```text
//! ┌────────────────────┐   datagram   ┌──────────────┐  RawTelemetry  ┌───────────────┐
//! │ UdpSocket          │─────────────►│ PacketDecoder│───────────────►│ CameraTracker │
//! │ (read timeout)     │              └──────────────┘                │ calibrate +   │
//! └────────────────────┘                     │ DecodeError            │ filter        │
//!          ▲ timeout: re-check running flag   ▼                        └───────────────┘
//!          └──────────────────────────── log, drop, continue
//! ```
//!
//! The receive timeout exists only so the thread notices the shutdown flag;
//! there is no retry or queueing of bad packets.
//!
//! # Example
//!
//! ```no_run
//! use freed_io::config::NetworkConfig;
//! use freed_io::protocol::{PacketDecoder, Profile};
//! use freed_io::receiver::TelemetryReceiver;
//! use freed_io::tracking::CameraTracker;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! let tracker = CameraTracker::default();
//! let running = Arc::new(AtomicBool::new(true));
//! let receiver = TelemetryReceiver::bind(
//!     &NetworkConfig::default(),
//!     PacketDecoder::for_profile(Profile::B),
//!     tracker.clone(),
//!     running,
//! )?;
//! let mut handle = receiver.start()?;
//!
//! let state = tracker.snapshot();
//! println!("pan {:.2} tilt {:.2}", state.pan, state.tilt);
//!
//! handle.stop();
//! # Ok::<(), freed_io::Error>(())
//! ```

use super::stats::{ReceiverStats, StatsSnapshot};
use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::protocol::{PacketDecoder, hex_preview};
use crate::tracking::CameraTracker;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Pause after a hard socket error before the next receive
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Decode failures logged at warn level before dropping to debug
const DECODE_WARN_LIMIT: u64 = 5;

/// Bytes shown in hex previews
const HEX_PREVIEW_BYTES: usize = 32;

/// Bound FreeD socket, ready to run
pub struct TelemetryReceiver {
    socket: UdpSocket,
    local_addr: SocketAddr,
    decoder: PacketDecoder,
    tracker: CameraTracker,
    running: Arc<AtomicBool>,
    stats: Arc<ReceiverStats>,
    max_datagram_size: usize,
}

impl TelemetryReceiver {
    /// Bind the telemetry socket.
    ///
    /// Bind failure is fatal and returned as [`Error::SocketBind`]; the
    /// receiver is never started in that case.
    pub fn bind(
        network: &NetworkConfig,
        decoder: PacketDecoder,
        tracker: CameraTracker,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let endpoint = network.endpoint();
        let socket = UdpSocket::bind(&endpoint).map_err(|source| Error::SocketBind {
            addr: endpoint.clone(),
            source,
        })?;

        // Short timeout so the loop can observe shutdown
        socket.set_read_timeout(Some(network.recv_timeout()))?;
        let local_addr = socket.local_addr()?;

        log::info!(
            "FreeD receiver bound to {} (profile {}, min frame {} bytes)",
            local_addr,
            decoder.layout().profile,
            decoder.layout().min_length
        );

        Ok(Self {
            socket,
            local_addr,
            decoder,
            tracker,
            running,
            stats: Arc::new(ReceiverStats::default()),
            max_datagram_size: network.max_datagram_size,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> Arc<ReceiverStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the receive loop on its own thread.
    ///
    /// The run flag belongs to the caller; if it is already cleared the loop
    /// exits without receiving.
    pub fn start(self) -> Result<ReceiverHandle> {
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        let local_addr = self.local_addr;

        let join = thread::Builder::new()
            .name("freed-receiver".to_string())
            .spawn(move || self.run())
            .map_err(|e| Error::Other(format!("Failed to spawn FreeD receiver: {}", e)))?;

        Ok(ReceiverHandle {
            running,
            join: Some(join),
            stats,
            local_addr,
        })
    }

    /// Run the receive loop on the calling thread until the running flag clears
    pub fn run(self) {
        log::info!("FreeD receiver started on {}", self.local_addr);

        let mut buffer = vec![0u8; self.max_datagram_size];

        while self.running.load(Ordering::Relaxed) {
            let (len, src) = match self.socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    log::trace!("No FreeD data (timeout)");
                    continue;
                }
                Err(e) => {
                    ReceiverStats::bump(&self.stats.recv_errors);
                    log::warn!("UDP receive error: {}", e);
                    thread::sleep(RECV_ERROR_BACKOFF);
                    continue;
                }
            };

            self.handle_datagram(&buffer[..len], src);
        }

        let stats = self.stats.snapshot();
        log::info!(
            "FreeD receiver stopped ({} datagrams, {} decoded, {} dropped, {} socket errors)",
            stats.datagrams,
            stats.decoded,
            stats.decode_errors,
            stats.recv_errors
        );
    }

    fn handle_datagram(&self, data: &[u8], src: SocketAddr) {
        let count = ReceiverStats::bump(&self.stats.datagrams);
        if count == 1 {
            log::info!(
                "First FreeD packet from {} ({} bytes): {}",
                src,
                data.len(),
                hex_preview(data, HEX_PREVIEW_BYTES)
            );
        }

        match self.decoder.decode(data) {
            Ok(telemetry) => {
                ReceiverStats::bump(&self.stats.decoded);
                let target = self.tracker.ingest(&telemetry, Instant::now());
                log::trace!(
                    "FreeD pan {:.2}° tilt {:.2}° zoom {} -> target pan {:.2} tilt {:.2}",
                    telemetry.pan_deg,
                    telemetry.tilt_deg,
                    telemetry.zoom_raw,
                    target.pan,
                    target.tilt
                );
            }
            Err(e) => {
                let errors = ReceiverStats::bump(&self.stats.decode_errors);
                if errors <= DECODE_WARN_LIMIT {
                    log::warn!(
                        "Dropping FreeD packet from {}: {} [{}]",
                        src,
                        e,
                        hex_preview(data, HEX_PREVIEW_BYTES)
                    );
                } else {
                    log::debug!("Dropping FreeD packet from {}: {}", src, e);
                }
            }
        }
    }
}

/// Control handle for a running receiver
///
/// Dropping the handle stops the receiver and joins its thread.
pub struct ReceiverHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    stats: Arc<ReceiverStats>,
    local_addr: SocketAddr,
}

impl ReceiverHandle {
    /// Signal the loop to exit and wait for it.
    ///
    /// Returns within roughly one receive timeout.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("FreeD receiver thread panicked");
            }
        }
    }

    /// True until the loop has exited
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Profile;

    fn loopback() -> NetworkConfig {
        NetworkConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            recv_timeout_ms: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_bind_reports_local_addr() {
        let receiver = TelemetryReceiver::bind(
            &loopback(),
            PacketDecoder::for_profile(Profile::B),
            CameraTracker::default(),
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();
        assert!(receiver.local_addr().ip().is_loopback());
        assert_ne!(receiver.local_addr().port(), 0);
    }

    #[test]
    fn test_bind_conflict_is_socket_error() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let network = NetworkConfig {
            port: taken.local_addr().unwrap().port(),
            ..loopback()
        };

        let result = TelemetryReceiver::bind(
            &network,
            PacketDecoder::for_profile(Profile::B),
            CameraTracker::default(),
            Arc::new(AtomicBool::new(true)),
        );
        assert!(matches!(result, Err(Error::SocketBind { .. })));
    }

    #[test]
    fn test_start_and_stop() {
        let receiver = TelemetryReceiver::bind(
            &loopback(),
            PacketDecoder::for_profile(Profile::B),
            CameraTracker::default(),
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        let mut handle = receiver.start().unwrap();
        assert!(handle.is_running());
        handle.stop();
        assert!(!handle.is_running());
        assert_eq!(handle.stats(), StatsSnapshot::default());
    }

    #[test]
    fn test_start_respects_cleared_flag() {
        let running = Arc::new(AtomicBool::new(false));
        let receiver = TelemetryReceiver::bind(
            &loopback(),
            PacketDecoder::for_profile(Profile::B),
            CameraTracker::default(),
            Arc::clone(&running),
        )
        .unwrap();

        let mut handle = receiver.start().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while handle.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!handle.is_running());
        assert!(!running.load(Ordering::Relaxed));
        handle.stop();
    }
}
