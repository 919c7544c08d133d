//! Receive/transmit counters.
//!
//! Atomic so a diagnostics task on another core can read them while the
//! transfer is running.

use core::sync::atomic::{AtomicU32, Ordering};

/// Counters since boot (never cleared).
pub struct RxStats {
    bytes_received: AtomicU32,
    bytes_sent: AtomicU32,
    timeouts: AtomicU32,
    line_errors: AtomicU32,
    send_errors: AtomicU32,
}

impl RxStats {
    pub const fn new() -> Self {
        Self {
            bytes_received: AtomicU32::new(0),
            bytes_sent: AtomicU32::new(0),
            timeouts: AtomicU32::new(0),
            line_errors: AtomicU32::new(0),
            send_errors: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.bytes_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self) {
        self.bytes_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_line_error(&self) {
        self.line_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the counters.
    #[inline]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            line_errors: self.line_errors.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for RxStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_received: u32,
    pub bytes_sent: u32,
    pub timeouts: u32,
    pub line_errors: u32,
    pub send_errors: u32,
}
