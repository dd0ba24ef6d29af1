//! General time utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A monotonic source of time which can also block the caller.
///
/// Control loops take their notion of "now" and their waits from a clock so
/// that they can be driven in virtual time.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Block the caller for the given duration.
    fn sleep(&self, duration: Duration);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall clock backed by `Instant` and `thread::sleep`.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant
}

/// Virtual clock which advances only when slept on.
///
/// Every sleep is recorded so the sequence of waits can be inspected.
#[derive(Debug, Default)]
pub struct SimClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now()
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }

    /// All sleeps performed on this clock, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).push(duration);
        self.advance(duration);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a whole number of milliseconds into a `Duration`, clamping negative
/// values to zero.
pub fn millis(ms: i64) -> Duration {
    if ms <= 0 {
        Duration::from_millis(0)
    }
    else {
        Duration::from_millis(ms as u64)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_clock() {
        let clock = SimClock::new();

        assert_eq!(clock.now(), Duration::from_millis(0));

        clock.sleep(Duration::from_millis(200));
        clock.advance(Duration::from_millis(5));
        clock.sleep(Duration::from_millis(10));

        assert_eq!(clock.now(), Duration::from_millis(215));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(200), Duration::from_millis(10)]
        );
    }

    #[test]
    fn test_millis() {
        assert_eq!(millis(-40), Duration::from_millis(0));
        assert_eq!(millis(0), Duration::from_millis(0));
        assert_eq!(millis(400), Duration::from_millis(400));
    }

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(duration_to_seconds(chrono::Duration::milliseconds(1500)), Some(1.5));
        assert_eq!(duration_to_seconds(chrono::Duration::milliseconds(-250)), Some(-0.25));
    }
}
