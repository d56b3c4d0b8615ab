//! Bounded-window running statistics for seek diagnostics.
//!
//! Keeps the last N samples with O(1) push: sum and count are maintained
//! incrementally, min/max are updated directly on insert and only rescanned
//! when the evicted sample was the current extreme. Also tracks the sum of
//! absolute consecutive-sample differences (jitter) over the window.

use std::collections::VecDeque;

/// Fixed-capacity FIFO of numeric samples with running min/max/avg.
#[derive(Debug, Clone)]
pub struct RunningStats {
    capacity: usize,
    window: VecDeque<f64>,
    sum: f64,
    diff_sum: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Capacity 0 is treated as 1; a window must hold something.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: VecDeque::with_capacity(capacity),
            sum: 0.0,
            diff_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Append a sample, evicting the oldest when the window is full.
    pub fn push(&mut self, value: f64) {
        let mut ejected_diff = 0.0;
        let evicted = if self.window.len() == self.capacity {
            let old = self.window.pop_front().expect("full window");
            self.sum -= old;
            if let Some(&next) = self.window.front() {
                ejected_diff = (next - old).abs();
            }
            Some(old)
        } else {
            None
        };

        if let Some(&prev) = self.window.back() {
            self.diff_sum += (value - prev).abs() - ejected_diff;
        }

        self.window.push_back(value);
        self.sum += value;

        // The evicted sample may have carried the extreme; only then does a
        // full rescan happen.
        match evicted {
            Some(old) if old == self.min || old == self.max => self.rescan(),
            _ => {
                self.min = self.min.min(value);
                self.max = self.max.max(value);
            }
        }
    }

    fn rescan(&mut self) {
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        for &v in &self.window {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    pub fn count(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.window.back().copied()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn average(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.sum / self.window.len() as f64)
        }
    }

    pub fn min(&self) -> Option<f64> {
        if self.window.is_empty() { None } else { Some(self.min) }
    }

    pub fn max(&self) -> Option<f64> {
        if self.window.is_empty() { None } else { Some(self.max) }
    }

    /// Sum of absolute differences between consecutive window samples.
    pub fn jitter(&self) -> f64 {
        self.diff_sum
    }
}
