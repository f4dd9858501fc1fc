use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::PhiAccrualConfig;
use crate::error::Result;
use crate::failure_detector::FailureDetector;
use crate::failure_detector::interval_window::IntervalWindow;

/// Upper bound on compare-and-swap attempts of a single [`heartbeat`](PhiAccrualFailureDetector::heartbeat).
/// Each failed attempt means another heartbeat was published in between.
pub const MAX_HEARTBEAT_ATTEMPTS: usize = 1 << 20;

/// Implementation of 'The Phi Accrual Failure Detector' by Hayashibara et al. as defined in their paper:
/// [https://oneofus.la/have-emacs-will-hack/files/HDY04.pdf]
///
/// The suspicion level of failure is given by a value called φ (phi).
/// The basic idea of the φ failure detector is to express the value of φ on a scale that
/// is dynamically adjusted to reflect current network conditions. A configurable
/// threshold is used to decide if φ is considered to be a failure.
///
/// The value of φ is calculated as:
///
/// {{{
/// φ = -log10(1 - F(timeSinceLastHeartbeat)
/// }}}
/// where F is the cumulative distribution function of a normal distribution with mean
/// and standard deviation estimated from historical heartbeat inter-arrival times.
///
/// The detector holds one immutable snapshot of its state behind an [`ArcSwap`]. Queries read
/// the snapshot; [`heartbeat`](Self::heartbeat) derives a new snapshot from a private copy of the
/// history and publishes it with a compare-and-swap, so a heartbeat that loses a race leaves
/// no trace in the published statistics.
///
/// The clock only measures intervals. Before the first heartbeat, phi is measured from
/// timestamp 0 of the clock against the bootstrap history.
pub struct PhiAccrualFailureDetector<C = MonotonicClock> {
    config: PhiAccrualConfig,
    clock: C,
    state: ArcSwap<State>,
    first_heartbeat: Arc<IntervalWindow>,
}

#[derive(Debug)]
struct State {
    history: Arc<IntervalWindow>,
    timestamp: Option<u64>,
}

impl PhiAccrualFailureDetector<MonotonicClock> {
    /// Creates a detector measuring time from now.
    pub fn new(config: PhiAccrualConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C> PhiAccrualFailureDetector<C> where C: Clock {
    pub fn with_clock(config: PhiAccrualConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let first_heartbeat = Arc::new(Self::first_heartbeat(&config)?);
        debug!(
            "phi accrual failure detector bootstrapped with mean {} std deviation {}",
            first_heartbeat.mean(),
            first_heartbeat.std_deviation(),
        );
        let state = State {
            history: first_heartbeat.clone(),
            timestamp: None,
        };
        let detector = Self {
            config,
            clock,
            state: ArcSwap::from_pointee(state),
            first_heartbeat,
        };
        Ok(detector)
    }

    /// Two samples straddling the estimate by a quarter of it, giving a generous deviation
    /// before any real interval is known.
    fn first_heartbeat(config: &PhiAccrualConfig) -> Result<IntervalWindow> {
        let mean = config.first_heartbeat_estimate_ms;
        let std_deviation = mean / 4;
        let mut history = IntervalWindow::new(config.max_sample_size as usize)?;
        // float arithmetic, the upper sample of a huge estimate does not fit in i64
        history.add_interval(mean as f64 - std_deviation as f64);
        history.add_interval(mean as f64 + std_deviation as f64);
        Ok(history)
    }

    pub fn config(&self) -> &PhiAccrualConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Timestamp of the last published heartbeat, `None` until the first one.
    pub fn last_heartbeat(&self) -> Option<u64> {
        self.state.load().timestamp
    }

    /// Copy of the currently published interval history.
    pub fn history(&self) -> IntervalWindow {
        IntervalWindow::clone(&self.state.load().history)
    }

    pub fn phi(&self) -> f64 {
        self.phi_at(self.clock.now_millis())
    }

    pub fn phi_at(&self, timestamp: u64) -> f64 {
        self.calc_phi(&self.state.load(), timestamp)
    }

    pub fn is_available(&self) -> bool {
        self.is_available_at(self.clock.now_millis())
    }

    pub fn is_available_at(&self, timestamp: u64) -> bool {
        self.calc_phi(&self.state.load(), timestamp) < self.config.threshold
    }

    pub fn is_monitoring(&self) -> bool {
        self.state.load().timestamp.is_some()
    }

    /// Records a heartbeat at the current clock reading.
    ///
    /// The interval since the previous heartbeat is learned only while the peer is still judged
    /// available; after a suspected outage the timestamp moves on but the gap is not learned.
    pub fn heartbeat(&self) {
        for attempt in 0..MAX_HEARTBEAT_ATTEMPTS {
            // load before reading the clock, a successful swap then never moves time backwards
            let current = self.state.load_full();
            let timestamp = self.clock.now_millis();
            let history = match current.timestamp {
                None => self.first_heartbeat.clone(),
                Some(latest_timestamp) => self.next_history(&current, latest_timestamp, timestamp),
            };
            let next = Arc::new(State {
                history,
                timestamp: Some(timestamp),
            });
            let previous = self.state.compare_and_swap(&current, next);
            if Arc::ptr_eq(&current, &previous) {
                debug!("heartbeat recorded at {} millis", timestamp);
                return;
            }
            trace!("heartbeat at {} millis lost the race on attempt {}, retrying", timestamp, attempt);
        }
        warn!("heartbeat abandoned after {} contended attempts", MAX_HEARTBEAT_ATTEMPTS);
    }

    fn next_history(&self, state: &State, latest_timestamp: u64, timestamp: u64) -> Arc<IntervalWindow> {
        let Some(interval) = timestamp.checked_sub(latest_timestamp) else {
            warn!("clock went backwards from {} to {} millis, interval ignored", latest_timestamp, timestamp);
            return state.history.clone();
        };
        if self.calc_phi(state, timestamp) >= self.config.threshold {
            debug!("peer suspected at {} millis, interval of {} millis not learned", timestamp, interval);
            return state.history.clone();
        }
        let acceptable_pause = self.config.acceptable_heartbeat_pause_ms;
        if acceptable_pause > 0 && interval as i64 >= acceptable_pause / 3 * 2 {
            warn!("heartbeat interval is growing too large: {} millis", interval);
        }
        let mut history = IntervalWindow::clone(&state.history);
        history.add_interval(interval as f64);
        Arc::new(history)
    }

    fn calc_phi(&self, state: &State, timestamp: u64) -> f64 {
        let time_diff = timestamp as f64 - state.timestamp.unwrap_or(0) as f64;
        let history = &state.history;
        let mean = history.mean();
        let std_deviation = self.ensure_valid_std_deviation(history.std_deviation());
        Self::phi_of(time_diff, mean + self.config.acceptable_heartbeat_pause_ms as f64, std_deviation)
    }

    /// Calculation of phi, derived from the Cumulative distribution function for
    /// N(mean, std_deviation) normal distribution, given by
    /// 1.0 / (1.0 + math.exp(-y * (1.5976 + 0.07056 * y * y)))
    /// where y = (x - mean) / standard_deviation
    /// This is an approximation defined in β Mathematics Handbook (Logistic approximation).
    ///
    /// The exponential overflows to infinity for extreme inputs, phi then settles at 0 or infinity.
    fn phi_of(time_diff: f64, mean: f64, std_deviation: f64) -> f64 {
        let y = (time_diff - mean) / std_deviation;
        let e = f64::exp(-y * (1.5976 + 0.07056 * y * y));
        if time_diff > mean {
            -f64::log10(e / (1.0 + e))
        } else {
            -f64::ln(1.0 - 1.0 / (1.0 + e))
        }
    }

    fn ensure_valid_std_deviation(&self, std_deviation: f64) -> f64 {
        std_deviation.max(self.config.min_std_deviation_ms as f64)
    }
}

impl<C> FailureDetector for PhiAccrualFailureDetector<C> where C: Clock {
    fn is_available(&self) -> bool {
        PhiAccrualFailureDetector::is_available(self)
    }

    fn is_monitoring(&self) -> bool {
        PhiAccrualFailureDetector::is_monitoring(self)
    }

    fn heartbeat(&self) {
        PhiAccrualFailureDetector::heartbeat(self)
    }
}

impl<C> Debug for PhiAccrualFailureDetector<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("PhiAccrualFailureDetector")
            .field("config", &self.config)
            .field("timestamp", &state.timestamp)
            .field("samples", &state.history.len())
            .finish_non_exhaustive()
    }
}
