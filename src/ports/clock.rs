//! Time source port
//!
//! Everything time-dependent in the engine reads the clock through this
//! trait so trackers can be driven deterministically in tests and replays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::TimestampMs;

pub trait Clock: Send + Sync {
    /// Milliseconds on the same scale as snapshot timestamps
    fn now_ms(&self) -> TimestampMs;
}

/// Wall-clock epoch captured once, advanced by a monotonic `Instant`
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
    origin_epoch_ms: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_epoch_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> TimestampMs {
        self.origin_epoch_ms + self.origin.elapsed().as_millis() as u64
    }
}

/// Settable clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: TimestampMs) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: TimestampMs) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward only; earlier readings are ignored
    pub fn advance_to(&self, now: TimestampMs) {
        self.now.fetch_max(now, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> TimestampMs {
        self.now.load(Ordering::SeqCst)
    }
}
