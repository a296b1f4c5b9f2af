//! Hike session tracking engine.
//!
//! Turns a noisy stream of GPS fixes into a smoothed path, a jitter-free
//! distance and accumulated bio-metrics (steps, strain, calories, water)
//! for an animal on a hike.

pub mod biometrics;
pub mod clock;
pub mod config;
pub mod enrichment;
pub mod environment;
pub mod error;
pub mod filters;
pub mod geodesic;
pub mod live_status;
pub mod session;
pub mod storage;
pub mod types;
pub mod watchdog;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::HikeConfig;
pub use environment::EnvironmentalCache;
pub use error::{HikeError, Result};
pub use filters::ScalarKalmanFilter;
pub use session::{FixOutcome, HikeSessionController, LocationSource, StartOutcome};
pub use types::{
    CompletedHikeRecord, Coordinate, EnvironmentalReading, FixSample, SessionState,
    SubjectProfile,
};
