//! Bio-metric model
//! Maps the distance covered since the previous fix to increments of steps,
//! strain, calories and water need for the tracked animal.

use crate::geodesic::METERS_PER_MILE;
use crate::types::{EnvironmentalReading, SessionState, SubjectProfile};

pub const FALLBACK_STRIDE_M: f64 = 0.5;
pub const STRAIN_CEILING: f64 = 100.0;

const HEAT_BASELINE_F: f64 = 65.0; // no heat load below this
const MAX_HEAT_TOLERANCE: f64 = 10.0;
const MEDICAL_RISK_FACTOR: f64 = 1.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BioMetricIncrement {
    pub steps: f64,
    pub strain: f64,
    pub calories: f64,
    pub water_oz: f64,
}

/// Stride length actually used: non-positive or non-finite values fall back.
pub fn effective_stride(stride_length_m: f64, fallback_m: f64) -> f64 {
    if stride_length_m.is_finite() && stride_length_m > 0.0 {
        stride_length_m
    } else {
        fallback_m
    }
}

pub fn steps_increment(distance_miles: f64, stride_length_m: f64, fallback_stride_m: f64) -> f64 {
    let fallback = effective_stride(fallback_stride_m, FALLBACK_STRIDE_M);
    distance_miles * METERS_PER_MILE / effective_stride(stride_length_m, fallback)
}

/// Heat load: grows with temperature above 65°F, scaled by how far the
/// subject is from full heat tolerance.
pub fn heat_factor(temperature_f: f64, heat_tolerance: f64) -> f64 {
    ((temperature_f - HEAT_BASELINE_F) * (MAX_HEAT_TOLERANCE - heat_tolerance) * 0.05).max(0.0)
}

pub fn strain_increment(distance_miles: f64, profile: &SubjectProfile, reading: &EnvironmentalReading) -> f64 {
    let medical = if profile.has_medical_risk {
        MEDICAL_RISK_FACTOR
    } else {
        1.0
    };
    distance_miles * 10.0 * medical + heat_factor(reading.temperature_f, profile.heat_tolerance) * 0.01
}

pub fn calories_increment(distance_miles: f64, weight_kg: f64) -> f64 {
    distance_miles * 1.6 * weight_kg * 0.75
}

pub fn water_increment(distance_miles: f64, temperature_f: f64) -> f64 {
    distance_miles * (0.5 + temperature_f / 100.0)
}

/// All four increments for one accepted fix. `fallback_stride_m` replaces an
/// unusable profile stride.
///
/// Each increment is floored at zero so accumulators never shrink, even for
/// out-of-range inputs.
pub fn compute_increment(
    distance_miles: f64,
    profile: &SubjectProfile,
    reading: &EnvironmentalReading,
    fallback_stride_m: f64,
) -> BioMetricIncrement {
    let floor = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    BioMetricIncrement {
        steps: floor(steps_increment(distance_miles, profile.stride_length_m, fallback_stride_m)),
        strain: floor(strain_increment(distance_miles, profile, reading)),
        calories: floor(calories_increment(distance_miles, profile.weight_kg)),
        water_oz: floor(water_increment(distance_miles, reading.temperature_f)),
    }
}

impl SessionState {
    /// Fold one increment into the accumulators. Strain saturates at 100.
    pub fn apply_increment(&mut self, inc: &BioMetricIncrement) {
        self.step_count += inc.steps;
        self.strain_index = (self.strain_index + inc.strain).min(STRAIN_CEILING);
        self.calories_burned += inc.calories;
        self.water_need_oz += inc.water_oz;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile() -> SubjectProfile {
        SubjectProfile::new("rex", 0.8, 5.0, 20.0)
    }

    #[test]
    fn test_zero_distance_cool_day() {
        let inc = compute_increment(0.0, &profile(), &EnvironmentalReading::new(60.0), FALLBACK_STRIDE_M);
        assert_eq!(inc, BioMetricIncrement::default());
    }

    #[test]
    fn test_steps_one_mile() {
        assert_relative_eq!(steps_increment(1.0, 0.8, FALLBACK_STRIDE_M), 1609.34 / 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_stride_fallback() {
        assert_relative_eq!(steps_increment(1.0, 0.0, FALLBACK_STRIDE_M), 1609.34 / 0.5, epsilon = 1e-9);
        assert_relative_eq!(steps_increment(1.0, -2.0, FALLBACK_STRIDE_M), 1609.34 / 0.5, epsilon = 1e-9);
        assert_relative_eq!(steps_increment(1.0, f64::NAN, FALLBACK_STRIDE_M), 1609.34 / 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_configured_stride_fallback() {
        assert_relative_eq!(steps_increment(1.0, 0.0, 0.25), 1609.34 / 0.25, epsilon = 1e-9);
        // the configured stride only stands in for a bad profile stride
        assert_relative_eq!(steps_increment(1.0, 0.8, 0.25), 1609.34 / 0.8, epsilon = 1e-9);
        // an unusable fallback falls back once more
        assert_relative_eq!(steps_increment(1.0, 0.0, -1.0), 1609.34 / 0.5, epsilon = 1e-9);

        let no_stride = SubjectProfile::new("pup", 0.0, 5.0, 5.0);
        let inc = compute_increment(0.5, &no_stride, &EnvironmentalReading::new(60.0), 0.25);
        assert_relative_eq!(inc.steps, 0.5 * 1609.34 / 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_heat_factor() {
        // (85 - 65) * (10 - 5) * 0.05 = 5.0
        assert_relative_eq!(heat_factor(85.0, 5.0), 5.0, epsilon = 1e-12);
        assert_eq!(heat_factor(50.0, 5.0), 0.0);
        assert_eq!(heat_factor(100.0, 10.0), 0.0);
    }

    #[test]
    fn test_heat_strain_applies_without_distance() {
        let inc = compute_increment(0.0, &profile(), &EnvironmentalReading::new(85.0), FALLBACK_STRIDE_M);
        assert_relative_eq!(inc.strain, 0.05, epsilon = 1e-12);
        assert_eq!(inc.steps, 0.0);
    }

    #[test]
    fn test_medical_risk_multiplies_distance_strain() {
        let reading = EnvironmentalReading::new(60.0);
        let healthy = strain_increment(1.0, &profile(), &reading);
        let at_risk = strain_increment(1.0, &profile().with_medical_risk(true), &reading);
        assert_relative_eq!(healthy, 10.0, epsilon = 1e-12);
        assert_relative_eq!(at_risk, 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calories_and_water() {
        assert_relative_eq!(calories_increment(1.0, 20.0), 24.0, epsilon = 1e-12);
        assert_relative_eq!(water_increment(2.0, 80.0), 2.6, epsilon = 1e-12);
    }

    #[test]
    fn test_increments_never_negative() {
        let odd = SubjectProfile::new("odd", 0.5, 5.0, -10.0);
        let inc = compute_increment(0.5, &odd, &EnvironmentalReading::new(-80.0), FALLBACK_STRIDE_M);
        assert!(inc.calories >= 0.0);
        assert!(inc.water_oz >= 0.0);
        assert!(inc.strain >= 0.0);
    }

    #[test]
    fn test_strain_saturates() {
        let mut state = SessionState {
            strain_index: 99.0,
            ..Default::default()
        };
        let inc = compute_increment(1.0, &profile(), &EnvironmentalReading::new(70.0), FALLBACK_STRIDE_M);
        state.apply_increment(&inc);
        assert_eq!(state.strain_index, STRAIN_CEILING);
        state.apply_increment(&inc);
        assert_eq!(state.strain_index, STRAIN_CEILING);
    }
}
