use serde::{Deserialize, Serialize};

/// Default process noise (Q) for a coordinate axis in degrees².
pub const DEFAULT_PROCESS_NOISE: f64 = 0.0001;
/// Default measurement noise (R) for a coordinate axis in degrees².
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 0.00002;
pub const DEFAULT_ERROR_ESTIMATE: f64 = 1.0;

/// Snapshot of the recursion state, exposed for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarKalmanState {
    pub estimate: f64,
    pub error_estimate: f64,
    pub process_noise: f64,
    pub measurement_noise: f64,
}

/// One-dimensional Kalman filter smoothing a single noisy scalar
/// (a latitude or a longitude stream).
#[derive(Clone, Debug)]
pub struct ScalarKalmanFilter {
    estimate: f64,
    error_estimate: f64,
    process_noise: f64,
    measurement_noise: f64,
}

impl ScalarKalmanFilter {
    pub fn new(
        process_noise: f64,
        measurement_noise: f64,
        initial_error_estimate: f64,
        initial_value: f64,
    ) -> Self {
        Self {
            estimate: initial_value,
            error_estimate: initial_error_estimate,
            process_noise,
            measurement_noise,
        }
    }

    /// Force the estimate to `value`.
    ///
    /// Used on the first real fix so the first smoothed output starts at the
    /// measurement instead of being dragged from the initial value.
    pub fn set_state(&mut self, value: f64) {
        self.estimate = value;
    }

    /// Run one predict/update cycle and return the new estimate.
    ///
    /// A `measurement_noise_override` becomes the stored R for this and all
    /// later calls (adaptive noise from the fix's reported accuracy).
    pub fn filter(
        &mut self,
        measurement: f64,
        control: f64,
        measurement_noise_override: Option<f64>,
    ) -> f64 {
        if let Some(r) = measurement_noise_override {
            self.measurement_noise = r;
        }

        // Predict
        let predicted_estimate = self.estimate + control;
        let predicted_error = self.error_estimate + self.process_noise;

        // Update
        let denom = predicted_error + self.measurement_noise;
        let gain = if denom > 0.0 { predicted_error / denom } else { 1.0 };
        self.estimate = predicted_estimate + gain * (measurement - predicted_estimate);
        self.error_estimate = (1.0 - gain) * predicted_error;

        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn error_estimate(&self) -> f64 {
        self.error_estimate
    }

    pub fn measurement_noise(&self) -> f64 {
        self.measurement_noise
    }

    pub fn get_state(&self) -> ScalarKalmanState {
        ScalarKalmanState {
            estimate: self.estimate,
            error_estimate: self.error_estimate,
            process_noise: self.process_noise,
            measurement_noise: self.measurement_noise,
        }
    }
}

impl Default for ScalarKalmanFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROCESS_NOISE,
            DEFAULT_MEASUREMENT_NOISE,
            DEFAULT_ERROR_ESTIMATE,
            0.0,
        )
    }
}
