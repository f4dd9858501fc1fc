use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Slots reserved up front; larger windows grow on demand.
const PREALLOCATED_INTERVALS: usize = 1024;

/// Bounded FIFO of heartbeat inter-arrival times in milliseconds.
///
/// The sum and the sum of squares are maintained on every insert and eviction, so
/// [`mean`](Self::mean), [`variance`](Self::variance) and
/// [`std_deviation`](Self::std_deviation) are O(1). They divide by the number of retained
/// intervals and return NaN on an empty window.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalWindow {
    capacity: usize,
    intervals: VecDeque<f64>,
    interval_sum: f64,
    squared_interval_sum: f64,
}

impl IntervalWindow {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_config("capacity", "must be > 0"));
        }
        let window = Self {
            capacity,
            intervals: VecDeque::with_capacity(capacity.min(PREALLOCATED_INTERVALS)),
            interval_sum: 0.0,
            squared_interval_sum: 0.0,
        };
        Ok(window)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Retained intervals, oldest first.
    pub fn intervals(&self) -> impl ExactSizeIterator<Item=f64> + '_ {
        self.intervals.iter().copied()
    }

    pub fn interval_sum(&self) -> f64 {
        self.interval_sum
    }

    pub fn squared_interval_sum(&self) -> f64 {
        self.squared_interval_sum
    }

    pub fn mean(&self) -> f64 {
        self.interval_sum / self.intervals.len() as f64
    }

    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.squared_interval_sum / self.intervals.len() as f64 - mean * mean
    }

    pub fn std_deviation(&self) -> f64 {
        // cancellation in the running sums can leave a tiny negative variance
        self.variance().max(0.0).sqrt()
    }

    /// Appends `interval`, evicting the oldest one first when the window is full.
    pub fn add_interval(&mut self, interval: f64) {
        if self.intervals.len() >= self.capacity {
            self.drop_oldest();
        }
        self.intervals.push_back(interval);
        self.interval_sum += interval;
        self.squared_interval_sum += interval * interval;
    }

    fn drop_oldest(&mut self) {
        if let Some(interval) = self.intervals.pop_front() {
            self.interval_sum -= interval;
            self.squared_interval_sum -= interval * interval;
        }
    }
}
