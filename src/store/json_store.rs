use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::engine::stats::Stats;
use crate::store::schema::StatsData;

const STATS_FILE: &str = "stats.json";

/// JSON files in the per-user data directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = data_dir();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Missing, unreadable or outdated files all come back as zeros.
    pub fn load_stats(&self) -> Stats {
        let path = self.file_path(STATS_FILE);
        if !path.exists() {
            return Stats::default();
        }
        let data = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(serde_json::from_str::<StatsData>(&content)?));
        match data {
            Ok(data) if data.needs_reset() => {
                warn!(
                    version = data.schema_version,
                    "stats file has an unknown layout, starting from zero"
                );
                Stats::default()
            }
            Ok(data) => data.stats,
            Err(e) => {
                warn!(path = %path.display(), "could not read stats: {e:#}");
                Stats::default()
            }
        }
    }

    /// Atomic: written to a temporary file, then renamed over the old one.
    pub fn save_stats(&self, stats: &Stats) -> Result<()> {
        let path = self.file_path(STATS_FILE);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(&StatsData::new(*stats))?;
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        debug!(correct = stats.correct, total = stats.total, "stats saved");
        Ok(())
    }

    pub fn reset_stats(&self) -> Result<()> {
        self.save_stats(&Stats::default())
    }
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spellmaster")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    fn sample() -> Stats {
        Stats {
            correct: 7,
            total: 9,
            streak: 3,
            best_streak: 5,
        }
    }

    #[test]
    fn missing_file_loads_zeros() {
        let (_dir, store) = make_test_store();
        assert_eq!(store.load_stats(), Stats::default());
    }

    #[test]
    fn saved_stats_load_back() {
        let (_dir, store) = make_test_store();
        store.save_stats(&sample()).unwrap();
        assert_eq!(store.load_stats(), sample());
        assert!(!store.file_path("stats.json.tmp").exists());
    }

    #[test]
    fn file_layout_is_flat() {
        let (_dir, store) = make_test_store();
        store.save_stats(&sample()).unwrap();
        let raw = fs::read_to_string(store.file_path(STATS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["correct"], 7);
        assert_eq!(value["schema_version"], 1);
        assert!(value["updated_at"].is_string());
    }

    #[test]
    fn corrupt_file_loads_zeros() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path(STATS_FILE), "{ not json").unwrap();
        assert_eq!(store.load_stats(), Stats::default());
    }

    #[test]
    fn older_file_without_best_streak_still_loads() {
        let (_dir, store) = make_test_store();
        fs::write(
            store.file_path(STATS_FILE),
            r#"{"schema_version":1,"correct":2,"total":3,"streak":1}"#,
        )
        .unwrap();
        let stats = store.load_stats();
        assert_eq!(stats.correct, 2);
        assert_eq!(stats.best_streak, 0);
    }

    #[test]
    fn unknown_schema_version_loads_zeros() {
        let (_dir, store) = make_test_store();
        fs::write(
            store.file_path(STATS_FILE),
            r#"{"schema_version":99,"correct":2,"total":3,"streak":1}"#,
        )
        .unwrap();
        assert_eq!(store.load_stats(), Stats::default());
    }

    #[test]
    fn reset_writes_zeros() {
        let (_dir, store) = make_test_store();
        store.save_stats(&sample()).unwrap();
        store.reset_stats().unwrap();
        assert_eq!(store.load_stats(), Stats::default());
    }
}
