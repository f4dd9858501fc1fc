//! Phi accrual failure detection for a single monitored peer.
//!
//! Instead of a binary up/down verdict, the detector turns the arrival pattern of heartbeats
//! into a continuous suspicion level φ that adapts to the peer's own jitter. Availability is
//! derived from a configurable threshold on φ.
//!
//! ```no_run
//! use phi_detector::config::PhiAccrualConfig;
//! use phi_detector::failure_detector::PhiAccrualFailureDetector;
//!
//! # fn main() -> phi_detector::error::Result<()> {
//! let detector = PhiAccrualFailureDetector::new(PhiAccrualConfig::default())?;
//! detector.heartbeat();
//! if !detector.is_available() {
//!     println!("peer suspected, phi {}", detector.phi());
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod ext;
pub mod failure_detector;

pub(crate) const PHI_DETECTOR_CONFIG: &str = include_str!("phi_detector.toml");
