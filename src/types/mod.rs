use serde::{Deserialize, Serialize};

/// Conversion used for the display speed only.
pub const MPS_TO_MPH: f64 = 2.237;

/// A recorded position. Raw when delivered by the location source,
/// smoothed once it lands in a session path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }
}

/// One fix from the location source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixSample {
    pub coordinate: Coordinate,
    /// Reported accuracy radius in meters
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// Reported ground speed in m/s
    #[serde(default)]
    pub speed_mps: Option<f64>,
}

impl FixSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude, timestamp_ms),
            accuracy_m: None,
            speed_mps: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }
}

/// Read-only description of the animal being tracked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub subject_id: String,
    pub stride_length_m: f64,
    /// 0 = very heat sensitive, 10 = very tolerant
    pub heat_tolerance: f64,
    pub weight_kg: f64,
    pub has_medical_risk: bool,
}

impl SubjectProfile {
    pub fn new(subject_id: &str, stride_length_m: f64, heat_tolerance: f64, weight_kg: f64) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            stride_length_m,
            heat_tolerance,
            weight_kg,
            has_medical_risk: false,
        }
    }

    pub fn with_medical_risk(mut self, has_medical_risk: bool) -> Self {
        self.has_medical_risk = has_medical_risk;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalReading {
    pub temperature_f: f64,
}

impl EnvironmentalReading {
    pub fn new(temperature_f: f64) -> Self {
        Self { temperature_f }
    }
}

impl Default for EnvironmentalReading {
    fn default() -> Self {
        Self { temperature_f: 70.0 }
    }
}

/// Live aggregate of an active session.
///
/// Every accumulator only grows within one session; `current_speed_mph`
/// is display data and is not an accumulator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub active: bool,
    pub start_time_ms: i64,
    pub elapsed_seconds: u64,
    pub distance_miles: f64,
    pub path: Vec<Coordinate>,
    pub step_count: f64,
    pub strain_index: f64,
    pub calories_burned: f64,
    pub water_need_oz: f64,
    pub current_speed_mph: f64,
}

/// Immutable snapshot written once when a session stops.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletedHikeRecord {
    pub record_id: String,
    pub subject_id: String,
    pub start_time_ms: i64,
    pub completion_time_ms: i64,
    pub completed_at_iso: String,
    pub elapsed_seconds: u64,
    pub distance_miles: f64,
    pub path: Vec<Coordinate>,
    pub step_count: f64,
    pub strain_index: f64,
    pub calories_burned: f64,
    pub water_need_oz: f64,
    /// Display speed at the moment the hike stopped
    #[serde(default)]
    pub current_speed_mph: f64,
    /// Narrative attached later by the analysis collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}
