// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Lock timestamps are persisted alongside resources and compared by other
//! processes, so the clock speaks wall-clock epoch milliseconds rather than
//! a process-local `Instant`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Milliseconds since the Unix epoch
pub type EpochMillis = i64;

/// A clock that provides the current wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_millis(&self) -> EpochMillis;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Fake clock for testing with controllable time
///
/// Clones share the same underlying time, so a clock handed to a coordinator
/// can still be advanced from the test.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<EpochMillis>>,
}

impl FakeClock {
    /// Start at a fixed, arbitrary point in time
    pub fn new() -> Self {
        Self::at(1_700_000_000_000)
    }

    pub fn at(millis: EpochMillis) -> Self {
        Self {
            current: Arc::new(Mutex::new(millis)),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += duration_millis(duration);
    }

    /// Set the clock to a specific epoch millisecond
    pub fn set(&self, millis: EpochMillis) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = millis;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> EpochMillis {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Convert a duration to whole milliseconds, saturating at `i64::MAX`
pub fn duration_millis(duration: Duration) -> EpochMillis {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
