use chrono::{TimeZone, Utc};
use std::cell::Cell;

/// Wall-clock source in epoch milliseconds.
///
/// Elapsed session time is always computed by subtracting two readings of
/// this clock, never by counting callbacks.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Real system time via chrono.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Externally driven clock for replay and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// RFC 3339 rendering of an epoch-millisecond timestamp.
pub fn to_rfc3339(epoch_ms: i64) -> String {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}
