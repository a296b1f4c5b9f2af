use log::warn;

/// Tracks time since the last fix to detect a lost GPS signal.
///
/// Lives outside the session controller: the event loop feeds it and decides
/// what to do (typically only logging, or calling `stop()`).
#[derive(Clone, Debug)]
pub struct FixWatchdog {
    last_fix_ms: Option<i64>,
    silence_threshold_ms: i64,
    reported: bool,
}

impl FixWatchdog {
    pub fn new(silence_threshold_secs: u64) -> Self {
        Self {
            last_fix_ms: None,
            silence_threshold_ms: silence_threshold_secs.saturating_mul(1000).min(i64::MAX as u64) as i64,
            reported: false,
        }
    }

    /// Start timing from `now_ms` (session start), before any fix arrived.
    pub fn arm(&mut self, now_ms: i64) {
        self.last_fix_ms = Some(now_ms);
        self.reported = false;
    }

    pub fn record_fix(&mut self, now_ms: i64) {
        self.last_fix_ms = Some(now_ms);
        self.reported = false;
    }

    pub fn time_since_last_fix_ms(&self, now_ms: i64) -> Option<i64> {
        self.last_fix_ms.map(|t| (now_ms - t).max(0))
    }

    pub fn is_silent(&self, now_ms: i64) -> bool {
        self.time_since_last_fix_ms(now_ms)
            .map(|d| d > self.silence_threshold_ms)
            .unwrap_or(false)
    }

    /// True once per silent period, on the first check past the threshold.
    pub fn check(&mut self, now_ms: i64) -> bool {
        if self.reported || !self.is_silent(now_ms) {
            return false;
        }
        self.reported = true;
        warn!(
            "GPS silent for {:.1}s",
            self.time_since_last_fix_ms(now_ms).unwrap_or(0) as f64 / 1000.0
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_is_never_silent() {
        let mut dog = FixWatchdog::new(10);
        assert!(!dog.is_silent(1_000_000));
        assert!(!dog.check(1_000_000));
    }

    #[test]
    fn test_silence_detection() {
        let mut dog = FixWatchdog::new(10);
        dog.arm(0);
        assert!(!dog.is_silent(10_000));
        assert!(dog.is_silent(10_001));

        dog.record_fix(12_000);
        assert!(!dog.is_silent(15_000));
        assert_eq!(dog.time_since_last_fix_ms(15_000), Some(3_000));
    }

    #[test]
    fn test_huge_threshold_saturates() {
        let mut dog = FixWatchdog::new(u64::MAX);
        dog.arm(0);
        assert!(!dog.is_silent(i64::MAX));
        assert!(!dog.check(i64::MAX));
    }

    #[test]
    fn test_check_reports_once_per_silence() {
        let mut dog = FixWatchdog::new(5);
        dog.arm(0);
        assert!(dog.check(6_000));
        assert!(!dog.check(7_000));

        dog.record_fix(8_000);
        assert!(!dog.check(9_000));
        assert!(dog.check(14_000));
    }
}
