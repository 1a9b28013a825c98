//! Rolling-mean smoother over the last k brightness samples

use std::collections::VecDeque;

/// Default window length
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// Sliding-window arithmetic mean
///
/// Knocks out single-frame flicker (auto-exposure, compression artifacts)
/// while lagging a squat by at most `capacity - 1` ticks.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl SignalSmoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SignalSmoother {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a value, evict past capacity, return the smoothed value
    pub fn push(&mut self, value: f64) -> f64 {
        self.window.push_back(value);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        // Never empty after a push
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// Mean of the current window, if any samples are held
    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

impl Default for SignalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}
