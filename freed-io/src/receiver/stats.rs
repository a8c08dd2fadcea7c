//! Receiver diagnostic counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the receive thread
#[derive(Debug, Default)]
pub struct ReceiverStats {
    /// Datagrams read from the socket
    pub datagrams: AtomicU64,
    /// Datagrams decoded and applied to the tracker
    pub decoded: AtomicU64,
    /// Datagrams dropped by the decoder
    pub decode_errors: AtomicU64,
    /// Socket receive failures (timeouts excluded)
    pub recv_errors: AtomicU64,
}

/// Point-in-time copy of [`ReceiverStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub datagrams: u64,
    pub decoded: u64,
    pub decode_errors: u64,
    pub recv_errors: u64,
}

impl ReceiverStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }

    /// Increment a counter, returning the new value
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
