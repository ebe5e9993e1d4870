use crate::error::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_CACHE_DURATION_SECS: u64 = 15 * 60;
const DEFAULT_BATCH_SIZE: usize = 6;
const DEFAULT_PAGE_SIZE: usize = 50;
/// Largest window chrono can represent in whole seconds.
const MAX_CACHE_DURATION_SECS: u64 = (i64::MAX / 1000) as u64;

/// Cache tuning, stored in `<state dir>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a full list stays fresh before `has_recipes` turns false.
    #[serde(default = "default_cache_duration_secs")]
    pub cache_duration_secs: u64,

    /// Records fetched concurrently per detail batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Page size requested from the list endpoint.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_cache_duration_secs() -> u64 {
    DEFAULT_CACHE_DURATION_SECS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_duration_secs: DEFAULT_CACHE_DURATION_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CacheConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let mut config: CacheConfig = serde_json::from_str(&content)?;
        config.batch_size = config.batch_size.max(1);
        config.page_size = config.page_size.max(1);
        config.cache_duration_secs = config.cache_duration_secs.min(MAX_CACHE_DURATION_SECS);
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn cache_duration(&self) -> Duration {
        i64::try_from(self.cache_duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Batches of zero would never make progress.
    pub fn set_batch_size(&mut self, size: usize) {
        self.batch_size = size.max(1);
    }

    pub fn set_cache_duration(&mut self, duration: std::time::Duration) {
        self.cache_duration_secs = duration.as_secs().min(MAX_CACHE_DURATION_SECS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_duration(), Duration::minutes(15));
        assert_eq!(config.batch_size, 6);
    }

    #[test]
    fn batch_size_never_zero() {
        let mut config = CacheConfig::default();
        config.set_batch_size(0);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn load_missing_config() {
        let dir = tempdir().unwrap();
        let config = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = CacheConfig::default();
        config.set_batch_size(3);
        config.set_cache_duration(std::time::Duration::from_secs(60));
        config.save(dir.path()).unwrap();

        let loaded = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.batch_size, 3);
        assert_eq!(loaded.cache_duration(), Duration::seconds(60));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"batch_size": 0}"#).unwrap();

        let loaded = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.batch_size, 1);
        assert_eq!(loaded.cache_duration_secs, 900);
        assert_eq!(loaded.page_size, 50);
    }

    #[test]
    fn huge_cache_duration_is_clamped() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{"cache_duration_secs": 10000000000000000}"#,
        )
        .unwrap();

        let loaded = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.cache_duration_secs, MAX_CACHE_DURATION_SECS);
        assert!(loaded.cache_duration() > Duration::days(365 * 1000));

        let mut config = CacheConfig::default();
        config.set_cache_duration(std::time::Duration::from_secs(u64::MAX));
        assert_eq!(config.cache_duration_secs, MAX_CACHE_DURATION_SECS);

        let unclamped = CacheConfig {
            cache_duration_secs: u64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(unclamped.cache_duration(), Duration::MAX);
    }
}
