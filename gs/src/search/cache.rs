//! File-backed key-value cache with time-based expiry
//!
//! Each entry is a JSON file named by the SHA-256 of its key.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on entry lifetime (a century)
const MAX_TTL_HOURS: i64 = 24 * 365 * 100;

/// Cache failures
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One stored entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    value: serde_json::Value,
    cached_at: DateTime<Utc>,
    ttl_hours: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let hours = i64::try_from(self.ttl_hours).unwrap_or(i64::MAX).min(MAX_TTL_HOURS);
        let ttl = Duration::hours(hours);
        now - self.cached_at > ttl
    }
}

/// Summary of what is on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub total_bytes: u64,
}

/// JSON file cache
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl_hours: u64,
    enabled: bool,
}

impl FileCache {
    /// Open a cache rooted at `dir`, creating it when enabled
    pub fn new(dir: impl Into<PathBuf>, ttl_hours: u64, enabled: bool) -> Result<Self, CacheError> {
        let dir = dir.into();
        debug!(dir = %dir.display(), %ttl_hours, %enabled, "FileCache::new: called");
        if enabled {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir, ttl_hours, enabled })
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            ttl_hours: 0,
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    fn read_entry(path: &Path) -> Result<CacheEntry, CacheError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn remove(path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "remove: failed to delete cache entry");
        }
    }

    /// Look up a live entry; expired or unreadable entries are deleted
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if !self.enabled {
            return None;
        }

        let path = self.path_for(key);
        if !path.exists() {
            debug!(%key, "get: miss");
            return None;
        }

        match Self::read_entry(&path) {
            Ok(entry) if entry.is_expired(Utc::now()) => {
                debug!(%key, "get: expired");
                Self::remove(&path);
                None
            }
            Ok(entry) => {
                debug!(%key, "get: hit");
                Some(entry.value)
            }
            Err(e) => {
                warn!(%key, error = %e, "get: unreadable entry, deleting");
                Self::remove(&path);
                None
            }
        }
    }

    /// Store a value; returns false when the cache is disabled
    pub fn set(&self, key: &str, value: serde_json::Value) -> Result<bool, CacheError> {
        if !self.enabled {
            debug!(%key, "set: cache disabled");
            return Ok(false);
        }

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            cached_at: Utc::now(),
            ttl_hours: self.ttl_hours,
        };
        fs::write(self.path_for(key), serde_json::to_string_pretty(&entry)?)?;
        debug!(%key, "set: stored");
        Ok(true)
    }

    /// Remove one entry; returns whether it existed
    pub fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for(key);
        if !self.enabled || !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Delete every entry, returning how many were removed
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let paths = self.entry_paths()?;
        for path in &paths {
            fs::remove_file(path)?;
        }
        debug!(removed = paths.len(), "clear_all: done");
        Ok(paths.len())
    }

    /// Delete expired and unreadable entries, returning how many were removed
    pub fn clear_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0;
        for path in self.entry_paths()? {
            let stale = Self::read_entry(&path).map_or(true, |entry| entry.is_expired(now));
            if stale {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        debug!(%removed, "clear_expired: done");
        Ok(removed)
    }

    /// Count entries and their size on disk
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let now = Utc::now();
        let mut stats = CacheStats::default();
        for path in self.entry_paths()? {
            stats.entries += 1;
            stats.total_bytes += fs::metadata(&path)?.len();
            if Self::read_entry(&path).map_or(true, |entry| entry.is_expired(now)) {
                stats.expired += 1;
            }
        }
        Ok(stats)
    }
}
