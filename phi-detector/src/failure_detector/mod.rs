pub use interval_window::IntervalWindow;
pub use phi_accrual_failure_detector::PhiAccrualFailureDetector;

pub mod interval_window;
pub mod phi_accrual_failure_detector;

/// Liveness verdict over one monitored resource.
///
/// Implementations are internally synchronized and may be shared between threads.
pub trait FailureDetector: Send + Sync {
    fn is_available(&self) -> bool;

    /// Whether at least one heartbeat has been recorded.
    fn is_monitoring(&self) -> bool;

    fn heartbeat(&self);
}
