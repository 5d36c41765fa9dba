// SPDX-License-Identifier: MIT

//! Clock abstraction for testable time handling.
//!
//! Every time-sensitive rule (node timeout, grounding expiry, reclaim
//! timeout, protocol-log pruning) is expressed against a [`Clock`] rather
//! than `SystemTime::now()` directly, so tests can advance time
//! deterministically instead of sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A clock that provides the current wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> i64;
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    secs: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { secs: Arc::new(Mutex::new(1_700_000_000)) }
    }

    pub fn at(secs: i64) -> Self {
        Self { secs: Arc::new(Mutex::new(secs)) }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.secs.lock() += duration.as_secs() as i64;
    }

    pub fn set(&self, secs: i64) {
        *self.secs.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> i64 {
        *self.secs.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
