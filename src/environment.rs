use crate::config::EnvironmentConfig;
use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::types::{Coordinate, EnvironmentalReading};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const CACHE_STORAGE_KEY: &str = "environment_cache";

/// Persistable form of the cache bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub reading: EnvironmentalReading,
    pub fetched_at_ms: i64,
    pub position: Coordinate,
}

/// Throttles environmental refreshes by age and displacement.
///
/// Never fetches anything itself: callers ask `should_refresh`, perform the
/// fetch through their own collaborator, then hand the value to
/// `record_fetch`. `current()` is what the bio-metric model consumes.
#[derive(Clone, Debug)]
pub struct EnvironmentalCache {
    config: EnvironmentConfig,
    current: EnvironmentalReading,
    last_fetch: Option<CacheSnapshot>,
}

impl EnvironmentalCache {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            current: EnvironmentalReading::default(),
            last_fetch: None,
        }
    }

    /// True when no fetch happened yet, the last one is older than the age
    /// limit, or the position moved past the displacement limit.
    ///
    /// Displacement is a planar distance in degrees; it only gates a refresh.
    pub fn should_refresh(&self, position: &Coordinate, now_ms: i64) -> bool {
        let Some(last) = &self.last_fetch else {
            return true;
        };

        let age_ms = now_ms - last.fetched_at_ms;
        if age_ms > self.config.max_age_ms {
            debug!("environment cache stale: {} ms old", age_ms);
            return true;
        }

        let d_lat = position.latitude - last.position.latitude;
        let d_lng = position.longitude - last.position.longitude;
        let displacement = (d_lat * d_lat + d_lng * d_lng).sqrt();
        if displacement > self.config.max_displacement_deg {
            debug!("environment cache moved: {:.4} deg", displacement);
            return true;
        }

        false
    }

    /// Same as `should_refresh`, but `force` bypasses the policy.
    pub fn should_refresh_forced(&self, position: &Coordinate, now_ms: i64, force: bool) -> bool {
        force || self.should_refresh(position, now_ms)
    }

    pub fn record_fetch(&mut self, reading: EnvironmentalReading, position: Coordinate, now_ms: i64) {
        info!(
            "environment refreshed: {:.1}°F at ({:.4}, {:.4})",
            reading.temperature_f, position.latitude, position.longitude
        );
        self.current = reading;
        self.last_fetch = Some(CacheSnapshot {
            reading,
            fetched_at_ms: now_ms,
            position,
        });
    }

    pub fn current(&self) -> EnvironmentalReading {
        self.current
    }

    pub fn last_fetch(&self) -> Option<&CacheSnapshot> {
        self.last_fetch.as_ref()
    }

    pub fn snapshot(&self) -> Option<CacheSnapshot> {
        self.last_fetch.clone()
    }

    /// Rebuild a cache from a snapshot so the throttle survives restarts.
    pub fn restore(config: EnvironmentConfig, snapshot: CacheSnapshot) -> Self {
        Self {
            config,
            current: snapshot.reading,
            last_fetch: Some(snapshot),
        }
    }

    pub fn save_to<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        if let Some(snapshot) = &self.last_fetch {
            store.put(CACHE_STORAGE_KEY, &serde_json::to_string(snapshot)?)?;
        }
        Ok(())
    }

    /// Load from `store`, or start empty when nothing was saved.
    pub fn load_from<S: KeyValueStore + ?Sized>(config: EnvironmentConfig, store: &S) -> Result<Self> {
        match store.get(CACHE_STORAGE_KEY)? {
            Some(text) => Ok(Self::restore(config, serde_json::from_str(&text)?)),
            None => Ok(Self::new(config)),
        }
    }
}
