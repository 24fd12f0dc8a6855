//! In-memory dedup cache shared by every fetch worker in a run.
//!
//! Answers "has this identifier already been resolved" so repeated
//! identifiers skip the network. The check-then-fetch sequence is not
//! atomic: two workers that miss on the same identifier at the same moment
//! both fetch, and the second `put` overwrites with an equivalent record.
//!
//! The cache can be seeded from, and written back to, a JSON snapshot so a
//! later run starts warm.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use foodcrawl_common::Record;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HarvestError, Result};

const SNAPSHOT_VERSION: u32 = 1;

pub struct DedupCache {
    entries: RwLock<HashMap<String, Record>>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Insert or overwrite. Visible to every subsequent `get` once this returns.
    pub fn put(&self, id: &str, record: Record) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a snapshot written by [`DedupCache::save_snapshot`]. A missing,
    /// unreadable or incompatible file yields an empty cache.
    pub fn load_snapshot(path: &Path) -> Self {
        let cache = Self::new();
        if !path.exists() {
            info!(path = %path.display(), "No cache snapshot yet, starting cold");
            return cache;
        }

        let snapshot: Snapshot = match File::open(path)
            .map_err(|e| e.to_string())
            .and_then(|f| serde_json::from_reader(BufReader::new(f)).map_err(|e| e.to_string()))
        {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache snapshot, starting cold");
                return cache;
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                path = %path.display(),
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "Cache snapshot version mismatch, starting cold"
            );
            return cache;
        }

        let mut skipped = 0usize;
        {
            let mut entries = cache.entries.write().unwrap_or_else(|e| e.into_inner());
            for record in snapshot.records {
                if record.id.is_empty() || !record.is_available() {
                    skipped += 1;
                    continue;
                }
                entries.insert(record.id.clone(), record);
            }
        }

        info!(
            path = %path.display(),
            records = cache.len(),
            skipped,
            saved_at = %snapshot.saved_at,
            "Loaded cache snapshot"
        );
        cache
    }

    /// Write every cached record to `path` (via a temp file and rename).
    /// Returns the number of records written.
    pub fn save_snapshot(&self, path: &Path) -> Result<usize> {
        let mut records: Vec<Record> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let count = records.len();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::Snapshot(e.to_string()))?;
        }

        let tmp = path.with_extension("tmp");
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            records,
        };
        let file = File::create(&tmp).map_err(|e| HarvestError::Snapshot(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)
            .map_err(|e| HarvestError::Snapshot(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| HarvestError::Snapshot(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| HarvestError::Snapshot(e.to_string()))?;

        info!(path = %path.display(), records = count, "Saved cache snapshot");
        Ok(count)
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(id: &str, image: &str) -> Record {
        Record {
            id: id.to_string(),
            name: format!("food {id}"),
            image: image.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn get_misses_until_put() {
        let cache = DedupCache::new();
        assert!(cache.get("a").is_none());

        cache.put("a", record("a", "a.png"));
        assert_eq!(cache.get("a").unwrap().name, "food a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let cache = DedupCache::new();
        cache.put("a", record("a", "old.png"));
        cache.put("a", record("a", "new.png"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().image, "new.png");
    }

    #[test]
    fn puts_from_other_threads_are_visible() {
        let cache = Arc::new(DedupCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let id = format!("id-{i}");
                    cache.put(&id, record(&id, "x.png"));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        assert!((0..8).all(|i| cache.get(&format!("id-{i}")).is_some()));
    }

    #[test]
    fn snapshot_round_trip_restores_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("snapshot.json");

        let cache = DedupCache::new();
        cache.put("a", record("a", "a.png"));
        cache.put("b", record("b", "b.png"));
        assert_eq!(cache.save_snapshot(&path).unwrap(), 2);

        let warm = DedupCache::load_snapshot(&path);
        assert_eq!(warm.len(), 2);
        assert_eq!(warm.get("b").unwrap().image, "b.png");
    }

    #[test]
    fn missing_snapshot_starts_cold() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DedupCache::load_snapshot(&dir.path().join("nope.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_snapshot_starts_cold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(DedupCache::load_snapshot(&path).is_empty());
    }

    #[test]
    fn snapshot_with_other_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let body = serde_json::json!({
            "version": 99,
            "saved_at": "2024-01-01T00:00:00Z",
            "records": [],
        });
        std::fs::write(&path, body.to_string()).unwrap();

        assert!(DedupCache::load_snapshot(&path).is_empty());
    }

    #[test]
    fn unavailable_records_in_snapshot_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            records: vec![record("a", "a.png"), record("b", "")],
        };
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let cache = DedupCache::load_snapshot(&path);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_none());
    }
}
