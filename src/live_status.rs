use crate::types::SessionState;
use serde::{Deserialize, Serialize};
use std::fs;

/// Display snapshot of an active hike, written periodically for a UI.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LiveStatus {
    pub timestamp_ms: i64,
    pub active: bool,
    pub elapsed_seconds: u64,
    pub distance_miles: f64,
    pub current_speed_mph: f64,
    pub step_count: f64,
    pub strain_index: f64,
    pub calories_burned: f64,
    pub water_need_oz: f64,
    pub path_points: usize,
    pub temperature_f: f64,
    // Signal health
    pub signal_degraded: bool,
    pub gps_silence_secs: f64,
}

impl LiveStatus {
    pub fn from_session(state: &SessionState, timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            active: state.active,
            elapsed_seconds: state.elapsed_seconds,
            distance_miles: state.distance_miles,
            current_speed_mph: state.current_speed_mph,
            step_count: state.step_count,
            strain_index: state.strain_index,
            calories_burned: state.calories_burned,
            water_need_oz: state.water_need_oz,
            path_points: state.path.len(),
            temperature_f: 0.0,
            signal_degraded: false,
            gps_silence_secs: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature_f: f64) -> Self {
        self.temperature_f = temperature_f;
        self
    }

    pub fn with_signal(mut self, degraded: bool, silence_ms: Option<i64>) -> Self {
        self.signal_degraded = degraded;
        self.gps_silence_secs = silence_ms.unwrap_or(0) as f64 / 1000.0;
        self
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
