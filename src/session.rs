use crate::biometrics::{compute_increment, effective_stride, BioMetricIncrement};
use crate::clock::{to_rfc3339, Clock};
use crate::config::{HikeConfig, SessionConfig};
use crate::error::{HikeError, Result};
use crate::filters::ScalarKalmanFilter;
use crate::geodesic::distance_miles;
use crate::types::{
    CompletedHikeRecord, Coordinate, EnvironmentalReading, FixSample, SessionState,
    SubjectProfile, MPS_TO_MPH,
};
use log::{debug, info, warn};

/// Meters per degree used to turn a fix's accuracy radius into filter noise.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Host capability check for a location source.
pub trait LocationSource {
    fn is_available(&self) -> bool;
}

/// Fixed answer, for hosts that know their capability up front.
#[derive(Clone, Copy, Debug)]
pub struct StaticLocationSource(pub bool);

impl LocationSource for StaticLocationSource {
    fn is_available(&self) -> bool {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// `start()` arrived while active: the running session was discarded
    Restarted,
}

/// What one accepted fix did to the session.
#[derive(Clone, Debug, PartialEq)]
pub struct FixOutcome {
    pub smoothed: Coordinate,
    /// 0 when below the jitter threshold or on the first fix
    pub added_distance_miles: f64,
    pub increment: BioMetricIncrement,
    /// True when this fix ended a degraded-signal period
    pub signal_recovered: bool,
}

/// Drives one hike at a time: Idle -> Active on `start`, back to Idle on
/// `stop`.
///
/// Every mutating call takes `&mut self`; callers serialize timer and
/// location events onto one owner.
pub struct HikeSessionController<C: Clock> {
    config: HikeConfig,
    clock: C,
    lat_filter: ScalarKalmanFilter,
    lng_filter: ScalarKalmanFilter,
    awaiting_first_fix: bool,
    profile: Option<SubjectProfile>,
    state: SessionState,
    signal_degraded: bool,
}

impl<C: Clock> HikeSessionController<C> {
    pub fn new(config: HikeConfig, clock: C) -> Self {
        let lat_filter = Self::fresh_filter(&config);
        let lng_filter = Self::fresh_filter(&config);
        Self {
            config,
            clock,
            lat_filter,
            lng_filter,
            awaiting_first_fix: true,
            profile: None,
            state: SessionState::default(),
            signal_degraded: false,
        }
    }

    fn fresh_filter(config: &HikeConfig) -> ScalarKalmanFilter {
        ScalarKalmanFilter::new(
            config.filter.process_noise,
            config.filter.measurement_noise,
            config.filter.initial_error_estimate,
            0.0,
        )
    }

    /// Idle -> Active.
    ///
    /// Fails with `NoLocationCapability` when the host has no location
    /// source; the controller state is left untouched in that case. Called
    /// while already active, the running session is discarded and a new one
    /// starts.
    pub fn start<L: LocationSource + ?Sized>(
        &mut self,
        profile: SubjectProfile,
        location: &L,
    ) -> Result<StartOutcome> {
        if !location.is_available() {
            warn!("refusing to start hike: no location source");
            return Err(HikeError::NoLocationCapability);
        }

        let outcome = if self.state.active {
            warn!(
                "start() while active: discarding session at {:.3} mi / {} s and restarting",
                self.state.distance_miles, self.state.elapsed_seconds
            );
            StartOutcome::Restarted
        } else {
            StartOutcome::Started
        };

        self.lat_filter = Self::fresh_filter(&self.config);
        self.lng_filter = Self::fresh_filter(&self.config);
        self.awaiting_first_fix = true;
        self.signal_degraded = false;
        self.profile = Some(sanitize_profile(profile, &self.config.session));
        self.state = SessionState {
            active: true,
            start_time_ms: self.clock.now_ms(),
            ..SessionState::default()
        };

        info!(
            "hike started for {}",
            self.profile.as_ref().map(|p| p.subject_id.as_str()).unwrap_or("?")
        );
        Ok(outcome)
    }

    /// Recompute elapsed seconds from the wall clock. Ignored while idle.
    pub fn on_tick(&mut self) -> Option<u64> {
        if !self.state.active {
            return None;
        }
        let elapsed_ms = (self.clock.now_ms() - self.state.start_time_ms).max(0);
        let elapsed = (elapsed_ms / 1000) as u64;
        // A clock stepping backwards must not shrink elapsed time
        self.state.elapsed_seconds = self.state.elapsed_seconds.max(elapsed);
        Some(self.state.elapsed_seconds)
    }

    /// Filter one raw fix and fold it into the session. Ignored while idle.
    pub fn on_fix(&mut self, fix: &FixSample, reading: &EnvironmentalReading) -> Option<FixOutcome> {
        if !self.state.active {
            return None;
        }

        let raw = fix.coordinate;
        if !raw.latitude.is_finite() || !raw.longitude.is_finite() {
            warn!("ignoring non-finite fix ({}, {})", raw.latitude, raw.longitude);
            return None;
        }

        let signal_recovered = std::mem::replace(&mut self.signal_degraded, false);
        if signal_recovered {
            info!("location signal recovered");
        }

        if self.awaiting_first_fix {
            self.lat_filter.set_state(raw.latitude);
            self.lng_filter.set_state(raw.longitude);
            self.awaiting_first_fix = false;
        }

        let noise = fix
            .accuracy_m
            .filter(|acc| acc.is_finite() && *acc > 0.0)
            .map(|acc| acc / METERS_PER_DEGREE);

        let smoothed = Coordinate::new(
            self.lat_filter.filter(raw.latitude, 0.0, noise),
            self.lng_filter.filter(raw.longitude, 0.0, noise),
            raw.timestamp_ms,
        );

        let mut added = 0.0;
        if let Some(prev) = self.state.path.last() {
            added = distance_miles(
                prev.latitude,
                prev.longitude,
                smoothed.latitude,
                smoothed.longitude,
            );
            if !(added >= self.config.session.jitter_threshold_miles) {
                added = 0.0;
            }
        }

        self.state.path.push(smoothed);
        self.state.distance_miles += added;

        let increment = match &self.profile {
            Some(profile) => {
                compute_increment(added, profile, reading, self.config.session.fallback_stride_m)
            }
            None => BioMetricIncrement::default(),
        };
        self.state.apply_increment(&increment);

        self.state.current_speed_mph = fix
            .speed_mps
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| s * MPS_TO_MPH)
            .unwrap_or(0.0);

        debug!(
            "fix ({:.6}, {:.6}) +{:.5} mi, total {:.4} mi",
            smoothed.latitude, smoothed.longitude, added, self.state.distance_miles
        );

        Some(FixOutcome {
            smoothed,
            added_distance_miles: added,
            increment,
            signal_recovered,
        })
    }

    /// Report a failed fix delivery. The session continues and nothing is
    /// accumulated. Returns true only on the healthy -> degraded transition.
    pub fn on_fix_error(&mut self, reason: &str) -> bool {
        if !self.state.active || self.signal_degraded {
            return false;
        }
        warn!("{}", HikeError::LocationSignalDegraded(reason.to_string()));
        self.signal_degraded = true;
        true
    }

    /// Active -> Idle.
    ///
    /// Returns a record only when the session ran longer than the minimum
    /// duration or covered more than the minimum distance. Always leaves
    /// the controller idle.
    pub fn stop(&mut self) -> Option<CompletedHikeRecord> {
        if !self.state.active {
            return None;
        }
        self.on_tick();
        self.state.active = false;
        self.signal_degraded = false;
        let profile = self.profile.take();

        let limits = &self.config.session;
        let keep = self.state.elapsed_seconds > limits.min_record_seconds
            || self.state.distance_miles > limits.min_record_miles;
        if !keep {
            info!(
                "hike discarded: {} s, {:.4} mi below record threshold",
                self.state.elapsed_seconds, self.state.distance_miles
            );
            return None;
        }

        let now = self.clock.now_ms();
        let record = CompletedHikeRecord {
            record_id: format!("hike_{}", now),
            subject_id: profile.map(|p| p.subject_id).unwrap_or_default(),
            start_time_ms: self.state.start_time_ms,
            completion_time_ms: now,
            completed_at_iso: to_rfc3339(now),
            elapsed_seconds: self.state.elapsed_seconds,
            distance_miles: self.state.distance_miles,
            path: self.state.path.clone(),
            step_count: self.state.step_count,
            strain_index: self.state.strain_index,
            calories_burned: self.state.calories_burned,
            water_need_oz: self.state.water_need_oz,
            current_speed_mph: self.state.current_speed_mph,
            analysis: None,
        };
        info!(
            "hike recorded: {} ({:.3} mi, {} s, strain {:.1})",
            record.record_id, record.distance_miles, record.elapsed_seconds, record.strain_index
        );
        Some(record)
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn is_signal_degraded(&self) -> bool {
        self.signal_degraded
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The sanitized profile of the running session.
    pub fn profile(&self) -> Option<&SubjectProfile> {
        self.profile.as_ref()
    }

    pub fn config(&self) -> &HikeConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Replace unusable profile values with safe fallbacks, logging each one.
pub fn sanitize_profile(mut profile: SubjectProfile, config: &SessionConfig) -> SubjectProfile {
    let stride = effective_stride(profile.stride_length_m, config.fallback_stride_m);
    if stride != profile.stride_length_m {
        warn!(
            "{}; using {} m",
            HikeError::InvalidProfile(format!("stride length {}", profile.stride_length_m)),
            stride
        );
        profile.stride_length_m = stride;
    }

    if !(profile.weight_kg > 0.0) || !profile.weight_kg.is_finite() {
        warn!(
            "{}; calories will not accumulate",
            HikeError::InvalidProfile(format!("weight {} kg", profile.weight_kg))
        );
        profile.weight_kg = 0.0;
    }

    let tolerance = if profile.heat_tolerance.is_finite() {
        profile.heat_tolerance.clamp(0.0, 10.0)
    } else {
        5.0
    };
    if tolerance != profile.heat_tolerance {
        warn!(
            "{}; using {}",
            HikeError::InvalidProfile(format!("heat tolerance {}", profile.heat_tolerance)),
            tolerance
        );
        profile.heat_tolerance = tolerance;
    }

    profile
}
