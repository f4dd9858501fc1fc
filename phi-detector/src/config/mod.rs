use config::{File, FileFormat, Source};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{Error, Result};
use crate::PHI_DETECTOR_CONFIG;

/// Tuning of a [`PhiAccrualFailureDetector`](crate::failure_detector::PhiAccrualFailureDetector).
///
/// [threshold] A low threshold is prone to generate many wrong suspicions but ensures a quick
///  detection in the event of a real crash. Conversely, a high threshold generates fewer mistakes
///  but needs more time to detect actual crashes.
/// [max_sample_size] Number of inter-arrival samples kept to estimate mean and standard deviation.
/// [min_std_deviation_ms] Floor applied to the observed standard deviation. Too low a deviation
///  makes phi over-sensitive to sudden, but normal, jitter.
/// [acceptable_heartbeat_pause_ms] Grace period added to the mean before a heartbeat counts as late,
///  to survive occasional pauses such as garbage collection or a dropped packet.
/// [first_heartbeat_estimate_ms] Bootstraps the statistics with two samples around this value and a
///  rather high standard deviation, since the environment is unknown in the beginning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct PhiAccrualConfig {
    #[builder(default = 8.0)]
    pub threshold: f64,
    #[builder(default = 1000)]
    pub max_sample_size: i32,
    #[builder(default = 100)]
    pub min_std_deviation_ms: i64,
    #[builder(default = 3000)]
    pub acceptable_heartbeat_pause_ms: i64,
    #[builder(default = 1000)]
    pub first_heartbeat_estimate_ms: i64,
}

impl Default for PhiAccrualConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PhiAccrualConfig {
    pub fn loader() -> PhiAccrualConfigLoader {
        PhiAccrualConfigLoader::default()
    }

    /// Checks every parameter and reports the first one out of its domain.
    pub fn validate(&self) -> Result<()> {
        // written as a negation so that NaN is rejected too
        if !(self.threshold > 0.0) {
            return Err(Error::invalid_config("threshold", "must be > 0"));
        }
        if self.max_sample_size <= 0 {
            return Err(Error::invalid_config("max_sample_size", "must be > 0"));
        }
        if self.min_std_deviation_ms <= 0 {
            return Err(Error::invalid_config("min_std_deviation", "must be > 0"));
        }
        if self.acceptable_heartbeat_pause_ms < 0 {
            return Err(Error::invalid_config("acceptable_heartbeat_pause", "must be >= 0"));
        }
        if self.first_heartbeat_estimate_ms <= 0 {
            return Err(Error::invalid_config("first_heartbeat_estimate", "must be > 0"));
        }
        Ok(())
    }
}

/// Layers configuration sources over the embedded defaults, later sources win.
#[derive(Debug)]
pub struct PhiAccrualConfigLoader {
    builder: config::ConfigBuilder<DefaultState>,
}

impl Default for PhiAccrualConfigLoader {
    fn default() -> Self {
        let builder = config::Config::builder()
            .add_source(File::from_str(PHI_DETECTOR_CONFIG, FileFormat::Toml));
        Self { builder }
    }
}

impl PhiAccrualConfigLoader {
    pub fn add_source<T>(self, source: T) -> Self where T: Source + Send + Sync + 'static {
        Self { builder: self.builder.add_source(source) }
    }

    pub fn build(self) -> Result<PhiAccrualConfig> {
        let config = self.builder.build()?.try_deserialize::<PhiAccrualConfig>()?;
        config.validate()?;
        Ok(config)
    }
}
