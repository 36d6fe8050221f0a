//! Eviction policies
//!
//! The cache never deletes anything on its own. A policy only runs when a
//! caller passes it to [`super::ObjectCache::evict`].

use std::path::PathBuf;
use std::time::SystemTime;

/// A cached object as seen by an eviction policy
#[derive(Debug, Clone)]
pub struct CachedObject {
    /// Path to the cached file on disk
    pub path: PathBuf,
    /// Size of the cached file in bytes
    pub size: u64,
    /// Last access time, or modification time where atime is unavailable
    pub last_used: SystemTime,
}

/// Decides which cached objects to remove
pub trait EvictionPolicy {
    fn select(&self, entries: &[CachedObject]) -> Vec<PathBuf>;
}

/// Never evicts
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl EvictionPolicy for KeepAll {
    fn select(&self, _entries: &[CachedObject]) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Evicts least recently used objects until the total fits in `max_bytes`
#[derive(Debug, Clone, Copy)]
pub struct LruBySize {
    pub max_bytes: u64,
}

impl EvictionPolicy for LruBySize {
    fn select(&self, entries: &[CachedObject]) -> Vec<PathBuf> {
        let total_size: u64 = entries.iter().map(|e| e.size).sum();
        if total_size <= self.max_bytes {
            return Vec::new();
        }

        // Sort by last used (oldest first)
        let mut sorted: Vec<&CachedObject> = entries.iter().collect();
        sorted.sort_by_key(|e| e.last_used);

        let target = total_size - self.max_bytes;
        let mut freed: u64 = 0;
        let mut selected = Vec::new();

        for entry in sorted {
            if freed >= target {
                break;
            }
            freed += entry.size;
            selected.push(entry.path.clone());
        }

        selected
    }
}
