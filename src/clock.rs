//! Injectable time source for the coordination layer.
//!
//! Every component that timestamps or measures (wait registry, seek stats,
//! ease sequences) reads time through `Clock` instead of calling into an
//! ambient source, so tests can drive time by hand.

use std::sync::Mutex;
use std::time::Instant;

/// Millisecond time source. Values only need to be comparable within one
/// clock instance; the zero point is unspecified.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Monotonic wall clock measured from construction.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests. Starts at zero.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: f64) -> Self {
        Self { now: Mutex::new(ms) }
    }

    pub fn set(&self, ms: f64) {
        *self.now.lock().expect("lock") = ms;
    }

    pub fn advance(&self, ms: f64) {
        *self.now.lock().expect("lock") += ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock().expect("lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn manual_clock_is_hand_driven() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0.0);
        clock.advance(16.0);
        clock.advance(16.0);
        assert_eq!(clock.now_ms(), 32.0);
        clock.set(1000.0);
        assert_eq!(clock.now_ms(), 1000.0);
    }
}
