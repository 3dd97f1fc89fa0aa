//! Monotonic time sources for the engine
//!
//! The engine reads the clock exactly once per update and compares the
//! reading against stored deadlines. Readings are durations since the clock
//! was created, so deadlines stay plain `Duration` values.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A monotonic clock
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

/// Wall-clock backed monotonic clock
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// Monotonic start time for relative timestamp calculation
    start_instant: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start_instant.elapsed()
    }
}

/// Clock advanced by hand, for deterministic timing scenarios
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.saturating_add(by);
    }

    /// Move the clock forward by fractional seconds
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    /// Jump to an absolute reading. Readings never go backwards.
    pub fn set(&self, at: Duration) {
        let mut now = self.now.lock();
        *now = (*now).max(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}
