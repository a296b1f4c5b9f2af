use crate::error::{HikeError, Result};
use crate::filters::scalar_kalman::{
    DEFAULT_ERROR_ESTIMATE, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Noise parameters for the per-axis coordinate filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub initial_error_estimate: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            initial_error_estimate: DEFAULT_ERROR_ESTIMATE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Step distances below this are GPS drift and count as zero (~1 m)
    pub jitter_threshold_miles: f64,
    /// A stopped session is kept if it ran longer than this...
    pub min_record_seconds: u64,
    /// ...or covered more than this
    pub min_record_miles: f64,
    pub fallback_stride_m: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jitter_threshold_miles: 0.0006,
            min_record_seconds: 5,
            min_record_miles: 0.01,
            fallback_stride_m: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub max_age_ms: i64,
    /// Planar displacement in degrees (~5 miles at 0.07)
    pub max_displacement_deg: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            max_age_ms: 15 * 60 * 1000,
            max_displacement_deg: 0.07,
        }
    }
}

/// All engine tunables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HikeConfig {
    pub filter: FilterConfig,
    pub session: SessionConfig,
    pub environment: EnvironmentConfig,
}

impl HikeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HikeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            HikeError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.session.jitter_threshold_miles >= 0.0) {
            return Err(HikeError::Config(
                "jitter_threshold_miles must be >= 0".to_string(),
            ));
        }
        if !(self.session.min_record_miles >= 0.0) {
            return Err(HikeError::Config("min_record_miles must be >= 0".to_string()));
        }
        if !(self.session.fallback_stride_m > 0.0) {
            return Err(HikeError::Config("fallback_stride_m must be > 0".to_string()));
        }
        if !(self.filter.process_noise >= 0.0)
            || !(self.filter.measurement_noise >= 0.0)
            || !(self.filter.initial_error_estimate >= 0.0)
        {
            return Err(HikeError::Config(
                "filter noise parameters must be >= 0".to_string(),
            ));
        }
        if self.environment.max_age_ms < 0 || !(self.environment.max_displacement_deg >= 0.0) {
            return Err(HikeError::Config(
                "environment thresholds must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}
