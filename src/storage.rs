use crate::clock::to_rfc3339;
use crate::error::{HikeError, Result};
use crate::types::CompletedHikeRecord;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const HISTORY_KEY: &str = "hike_history";

/// Opaque key-value persistence service.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(HikeError::Storage(format!("invalid key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write then rename so a crash never leaves a truncated file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("stored {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Completed hikes, newest first, persisted under `HISTORY_KEY`.
pub struct HikeHistory<S: KeyValueStore> {
    store: S,
    records: Vec<CompletedHikeRecord>,
}

impl<S: KeyValueStore> HikeHistory<S> {
    pub fn open(store: S) -> Result<Self> {
        let records = match store.get(HISTORY_KEY)? {
            Some(text) => serde_json::from_str(&text)?,
            None => Vec::new(),
        };
        Ok(Self { store, records })
    }

    pub fn add(&mut self, record: CompletedHikeRecord) -> Result<()> {
        self.records.insert(0, record);
        self.persist()
    }

    pub fn records(&self) -> &[CompletedHikeRecord] {
        &self.records
    }

    pub fn for_subject<'a>(&'a self, subject_id: &'a str) -> impl Iterator<Item = &'a CompletedHikeRecord> + 'a {
        self.records.iter().filter(move |r| r.subject_id == subject_id)
    }

    pub fn get(&self, record_id: &str) -> Option<&CompletedHikeRecord> {
        self.records.iter().find(|r| r.record_id == record_id)
    }

    /// Attach a narrative from the analysis collaborator.
    /// Returns false when no record has this id.
    pub fn attach_analysis(&mut self, record_id: &str, analysis: &str) -> Result<bool> {
        match self.records.iter_mut().find(|r| r.record_id == record_id) {
            Some(record) => {
                record.analysis = Some(analysis.to_string());
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.records)?;
        self.store.put(HISTORY_KEY, &json)
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// GPX 1.1 document of a completed hike's smoothed path
pub fn to_gpx_xml(record: &CompletedHikeRecord) -> String {
    let name = escape_xml(&format!("Hike {} ({})", record.record_id, record.subject_id));
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<gpx version=\"1.1\" creator=\"HikeTracker\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n");
    xml.push_str("  <metadata>\n");
    xml.push_str(&format!("    <name>{}</name>\n", name));
    xml.push_str(&format!(
        "    <desc>{:.3} mi in {} s</desc>\n",
        record.distance_miles, record.elapsed_seconds
    ));
    xml.push_str(&format!("    <time>{}</time>\n", to_rfc3339(record.start_time_ms)));
    xml.push_str("  </metadata>\n");
    xml.push_str("  <trk>\n");
    xml.push_str(&format!("    <name>{}</name>\n", name));
    xml.push_str("    <trkseg>\n");

    for point in &record.path {
        xml.push_str(&format!(
            "      <trkpt lat=\"{}\" lon=\"{}\">\n",
            point.latitude, point.longitude
        ));
        xml.push_str(&format!("        <time>{}</time>\n", to_rfc3339(point.timestamp_ms)));
        xml.push_str("      </trkpt>\n");
    }

    xml.push_str("    </trkseg>\n");
    xml.push_str("  </trk>\n");
    xml.push_str("</gpx>\n");

    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn record(id: &str, subject: &str) -> CompletedHikeRecord {
        CompletedHikeRecord {
            record_id: id.to_string(),
            subject_id: subject.to_string(),
            start_time_ms: 0,
            completion_time_ms: 60_000,
            completed_at_iso: to_rfc3339(60_000),
            elapsed_seconds: 60,
            distance_miles: 0.25,
            path: vec![
                Coordinate::new(40.0, -105.0, 0),
                Coordinate::new(40.001, -105.001, 30_000),
            ],
            step_count: 500.0,
            strain_index: 2.5,
            calories_burned: 7.5,
            water_need_oz: 0.3,
            current_speed_mph: 0.0,
            analysis: None,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "hike_tracker_{}_{}_{}",
            tag,
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_json_file_store() {
        let dir = temp_dir("store");
        let mut store = JsonFileStore::open(&dir).unwrap();
        assert_eq!(store.get("hike_history").unwrap(), None);
        store.put("hike_history", "[]").unwrap();
        assert_eq!(store.get("hike_history").unwrap().as_deref(), Some("[]"));
        store.remove("hike_history").unwrap();
        store.remove("hike_history").unwrap();
        assert_eq!(store.get("hike_history").unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_file_store_rejects_path_keys() {
        let dir = temp_dir("keys");
        let store = JsonFileStore::open(&dir).unwrap();
        assert!(matches!(store.get("../etc/passwd"), Err(HikeError::Storage(_))));
        assert!(store.get("").is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_history_newest_first_and_per_subject() {
        let mut history = HikeHistory::open(MemoryStore::new()).unwrap();
        history.add(record("hike_1", "rex")).unwrap();
        history.add(record("hike_2", "bella")).unwrap();
        history.add(record("hike_3", "rex")).unwrap();

        let ids: Vec<_> = history.records().iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["hike_3", "hike_2", "hike_1"]);

        let rex: Vec<_> = history.for_subject("rex").map(|r| r.record_id.clone()).collect();
        assert_eq!(rex, vec!["hike_3", "hike_1"]);
    }

    #[test]
    fn test_history_survives_reopen() {
        let mut history = HikeHistory::open(MemoryStore::new()).unwrap();
        let original = record("hike_1", "rex");
        history.add(original.clone()).unwrap();
        let store = history.into_store();

        let reopened = HikeHistory::open(store).unwrap();
        assert_eq!(reopened.records(), &[original]);
    }

    #[test]
    fn test_attach_analysis() {
        let mut history = HikeHistory::open(MemoryStore::new()).unwrap();
        history.add(record("hike_1", "rex")).unwrap();

        assert!(history.attach_analysis("hike_1", "Solid pace, watch the paws.").unwrap());
        assert!(!history.attach_analysis("hike_missing", "n/a").unwrap());

        let reopened = HikeHistory::open(history.into_store()).unwrap();
        assert_eq!(
            reopened.get("hike_1").and_then(|r| r.analysis.as_deref()),
            Some("Solid pace, watch the paws.")
        );
    }

    #[test]
    fn test_gpx_generation() {
        let gpx = to_gpx_xml(&record("hike_1", "rex & co"));
        assert!(gpx.starts_with("<?xml"));
        assert!(gpx.contains("<trkpt lat=\"40\" lon=\"-105\">"));
        assert!(gpx.contains("<trkpt lat=\"40.001\" lon=\"-105.001\">"));
        assert!(gpx.contains("rex &amp; co"));
        assert!(gpx.contains("<time>1970-01-01T00:00:30+00:00</time>"));
        assert_eq!(gpx.matches("<trkpt").count(), 2);
    }
}
