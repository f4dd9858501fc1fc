use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current time in milliseconds, measured from a fixed reference point.
///
/// Readings are only used for interval arithmetic, so the reference point is arbitrary,
/// but readings must be non-decreasing across calls. The detector never corrects for a
/// clock that jumps backwards.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

impl<C> Clock for Arc<C> where C: Clock + ?Sized {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Copy, Clone)]
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
    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self { millis: Arc::new(AtomicU64::new(start_millis)) }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Release);
    }

    pub fn advance(&self, duration: Duration) -> u64 {
        let millis = duration.as_millis() as u64;
        self.millis.fetch_add(millis, Ordering::AcqRel) + millis
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}

/// Scripted clock: every reading advances time by the next queued interval.
///
/// Once the script is exhausted the clock stands still at its last reading.
pub struct FakeClock {
    inner: Mutex<FakeClockInner>,
}

struct FakeClockInner {
    now: u64,
    intervals: VecDeque<u64>,
}

impl FakeClock {
    pub fn new(start_millis: u64, intervals: impl IntoIterator<Item=u64>) -> Self {
        let inner = FakeClockInner {
            now: start_millis,
            intervals: intervals.into_iter().collect(),
        };
        Self { inner: Mutex::new(inner) }
    }

    pub fn remaining(&self) -> usize {
        self.inner.lock().intervals.len()
    }
}

impl Debug for FakeClock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FakeClock")
            .field("now", &inner.now)
            .field("remaining", &inner.intervals.len())
            .finish()
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> u64 {
        let mut inner = self.inner.lock();
        if let Some(interval) = inner.intervals.pop_front() {
            inner.now += interval;
        }
        inner.now
    }
}
