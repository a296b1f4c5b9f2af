use anyhow::{Context, Result};
use hike_tracker_rs::session::LocationSource;
use hike_tracker_rs::types::{Coordinate, EnvironmentalReading, FixSample};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tokio::sync::mpsc::Sender;
use tokio::time::{sleep, Duration};

/// One line of a recorded fix log.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Fix {
        timestamp_ms: i64,
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        accuracy_m: Option<f64>,
        #[serde(default)]
        speed_mps: Option<f64>,
    },
    Error {
        timestamp_ms: i64,
        reason: String,
    },
}

impl LogEntry {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            LogEntry::Fix { timestamp_ms, .. } | LogEntry::Error { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

/// Events delivered to the single consumer that owns the controller.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Tick { now_ms: i64 },
    Fix(FixSample),
    FixError { now_ms: i64, reason: String },
}

impl SessionEvent {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            SessionEvent::Tick { now_ms } | SessionEvent::FixError { now_ms, .. } => *now_ms,
            SessionEvent::Fix(fix) => fix.coordinate.timestamp_ms,
        }
    }
}

impl From<LogEntry> for SessionEvent {
    fn from(entry: LogEntry) -> Self {
        match entry {
            LogEntry::Fix {
                timestamp_ms,
                latitude,
                longitude,
                accuracy_m,
                speed_mps,
            } => SessionEvent::Fix(FixSample {
                coordinate: Coordinate::new(latitude, longitude, timestamp_ms),
                accuracy_m,
                speed_mps,
            }),
            LogEntry::Error {
                timestamp_ms,
                reason,
            } => SessionEvent::FixError {
                now_ms: timestamp_ms,
                reason,
            },
        }
    }
}

/// A loaded fix log, sorted by time.
pub struct FixLog {
    pub entries: Vec<LogEntry>,
}

impl FixLog {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut entries: Vec<LogEntry> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        entries.sort_by_key(|e| e.timestamp_ms());
        Ok(Self { entries })
    }

    pub fn start_ms(&self) -> Option<i64> {
        self.entries.first().map(|e| e.timestamp_ms())
    }
}

impl LocationSource for FixLog {
    /// A log without a single fix means the recording host had no GPS.
    fn is_available(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, LogEntry::Fix { .. }))
    }
}

/// Supplier of environmental readings for the replay.
pub trait EnvironmentSource {
    fn fetch(&mut self, position: &Coordinate) -> Result<EnvironmentalReading>;
}

pub struct ConstantEnvironment {
    pub temperature_f: f64,
    pub fetches: u64,
}

impl EnvironmentSource for ConstantEnvironment {
    fn fetch(&mut self, _position: &Coordinate) -> Result<EnvironmentalReading> {
        self.fetches += 1;
        Ok(EnvironmentalReading::new(self.temperature_f))
    }
}

/// Emit log entries interleaved with 1 Hz ticks, in time order.
///
/// `speed` scales the replay against real time; 0 replays as fast as the
/// consumer accepts events.
pub async fn replay_loop(entries: Vec<LogEntry>, tx: Sender<SessionEvent>, speed: f64) {
    let Some(start) = entries.first().map(|e| e.timestamp_ms()) else {
        return;
    };
    let mut next_tick = start + 1000;
    let mut last_sent = start;
    let mut sent = 0u64;

    for entry in entries {
        let ts = entry.timestamp_ms();
        while next_tick <= ts {
            if !emit(&tx, SessionEvent::Tick { now_ms: next_tick }, &mut last_sent, speed).await {
                return;
            }
            next_tick += 1000;
        }
        if !emit(&tx, entry.into(), &mut last_sent, speed).await {
            log::debug!("[feed] consumer closed after {} entries", sent);
            return;
        }
        sent += 1;
    }

    let _ = emit(&tx, SessionEvent::Tick { now_ms: last_sent }, &mut last_sent, speed).await;
    log::debug!("[feed] replayed {} entries", sent);
}

async fn emit(tx: &Sender<SessionEvent>, event: SessionEvent, last_sent: &mut i64, speed: f64) -> bool {
    let ts = event.timestamp_ms();
    if speed > 0.0 && ts > *last_sent {
        let wait_ms = (ts - *last_sent) as f64 / speed;
        sleep(Duration::from_millis(wait_ms as u64)).await;
    }
    *last_sent = ts.max(*last_sent);
    tx.send(event).await.is_ok()
}
