//! Game-time supply.
//!
//! Alarm schedules are expressed in game time, which may run faster or
//! slower than wall time. The inspector converts game-time deltas to
//! real-world seconds by dividing through the clock's rate.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Supplies the current game time and its rate relative to wall time.
pub trait GameClock: Send + Sync {
    /// Current game time as epoch milliseconds.
    fn now_millis(&self) -> i64;

    /// Game-time rate: `2.0` means game time advances twice as fast as
    /// wall time.
    fn rate(&self) -> f64;
}

/// Wall-clock game time at rate `1.0`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl GameClock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn rate(&self) -> f64 {
        1.0
    }
}

/// A settable clock for tests and deterministic hosts.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
    rate_bits: AtomicU64,
}

impl FixedClock {
    #[must_use]
    pub fn new(millis: i64, rate: f64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
            rate_bits: AtomicU64::new(rate.to_bits()),
        }
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::Relaxed);
    }

    pub fn set_rate(&self, rate: f64) {
        self.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }
}

impl GameClock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }

    fn rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }
}
