//! Local Object Cache
//!
//! Maps each (bucket, key) to a fixed file under the cache root, next to a
//! `.<name>.etag` sidecar and a `.<name>.lock` lock file. New content is
//! written to a temp file and renamed into place, so readers only ever see a
//! complete old or complete new object.

use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::eviction::{CachedObject, EvictionPolicy};
use super::lock::KeyLock;
use crate::error::{FastGcsError, IoContext, Result};
use crate::gcs::ObjectReference;

/// Prefix of in-flight object downloads
const DOWNLOAD_PREFIX: &str = ".download-";

/// Prefix of in-flight sidecar writes
const SIDECAR_TMP_PREFIX: &str = ".etag-";

/// Temp files older than this are left over from an interrupted run
const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Cached objects are plain user files
const OBJECT_MODE: u32 = 0o644;

/// Where an object lives locally and the ETag it was fetched with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub local_path: PathBuf,
    /// Absent until the first successful fetch
    pub etag: Option<String>,
}

/// File name for a cached object: `<bucket>--<key with '/' replaced by '-'>`
///
/// Distinct keys can collide when a key already contains `-` where another
/// has `/` (`a/b` and `a-b`); the two then share a file. The name never
/// starts with `.`, since [`ObjectReference::parse`] rejects such buckets.
pub fn object_file_name(reference: &ObjectReference) -> String {
    format!("{}--{}", reference.bucket, reference.key.replace('/', "-"))
}

/// Local disk cache of downloaded objects
#[derive(Debug, Clone)]
pub struct ObjectCache {
    /// Root directory for cached files
    cache_dir: PathBuf,
}

impl ObjectCache {
    /// Open (creating if needed) the cache rooted at `cache_dir`
    ///
    /// # Arguments
    /// * `cache_dir` - Directory holding cached objects, sidecars and lock files
    ///
    /// # Returns
    /// The opened cache, after removing temp files older than an hour
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .io_context(|| format!("Failed to create cache directory: {:?}", cache_dir))?;

        let cache = Self { cache_dir };

        // Clean up temp files from interrupted runs
        cache.cleanup_stale(STALE_TEMP_AGE);

        debug!(cache_dir = %cache.cache_dir.display(), "Object cache opened");
        Ok(cache)
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local path for a reference; pure, no I/O
    pub fn path_for(&self, reference: &ObjectReference) -> PathBuf {
        self.cache_dir.join(object_file_name(reference))
    }

    /// Local path and last-known ETag for a reference
    pub fn entry(&self, reference: &ObjectReference) -> Result<CacheEntry> {
        let local_path = self.path_for(reference);
        let etag = self.read_etag(&local_path)?;
        Ok(CacheEntry { local_path, etag })
    }

    /// Sidecar path holding the ETag for `local_path`
    pub fn sidecar_path(local_path: &Path) -> PathBuf {
        dot_sibling(local_path, "etag")
    }

    /// Lock file path guarding `local_path`
    pub fn lock_path(local_path: &Path) -> PathBuf {
        dot_sibling(local_path, "lock")
    }

    /// Take the per-key lock for `local_path`
    pub async fn lock(&self, local_path: &Path) -> Result<KeyLock> {
        KeyLock::acquire_async(Self::lock_path(local_path)).await
    }

    /// Read the sidecar ETag, if any
    pub fn read_etag(&self, local_path: &Path) -> Result<Option<String>> {
        let sidecar = Self::sidecar_path(local_path);
        match fs::read_to_string(&sidecar) {
            Ok(etag) if etag.is_empty() => Ok(None),
            Ok(etag) => Ok(Some(etag)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).io_context(|| format!("Failed to read sidecar: {:?}", sidecar)),
        }
    }

    /// ETag to revalidate with: only when the object file is still present
    pub fn revalidation_etag(&self, local_path: &Path) -> Result<Option<String>> {
        let etag = self.read_etag(local_path)?;
        if etag.is_some() && !local_path.exists() {
            debug!(local = %local_path.display(), "Sidecar without cached file, forcing download");
            return Ok(None);
        }
        Ok(etag)
    }

    /// Atomically replace the sidecar with `etag`
    pub fn write_etag(&self, local_path: &Path, etag: &str) -> Result<()> {
        let sidecar = Self::sidecar_path(local_path);
        let mut tmp = tempfile::Builder::new()
            .prefix(SIDECAR_TMP_PREFIX)
            .tempfile_in(&self.cache_dir)
            .io_context(|| "Failed to create temp file for sidecar")?;

        tmp.write_all(etag.as_bytes())
            .io_context(|| "Failed to write sidecar")?;

        tmp.persist(&sidecar).map_err(|e| {
            FastGcsError::io(format!("Failed to persist sidecar: {:?}", sidecar), e.error)
        })?;
        Ok(())
    }

    /// Remove the sidecar; missing is fine
    pub fn remove_etag(&self, local_path: &Path) -> Result<()> {
        remove_if_exists(&Self::sidecar_path(local_path))
    }

    /// Fresh temp file in the cache directory for a download
    ///
    /// Deleted on drop unless handed to [`Self::promote`].
    pub fn begin_download(&self) -> Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(DOWNLOAD_PREFIX)
            .permissions(Permissions::from_mode(OBJECT_MODE))
            .tempfile_in(&self.cache_dir)
            .io_context(|| "Failed to create temp file for download")
    }

    /// Flush a finished download and rename it over `local_path`
    ///
    /// # Arguments
    /// * `tmp` - Download started with [`ObjectCache::begin_download`]
    /// * `local_path` - Cached path of the object, from [`ObjectCache::path_for`]
    ///
    /// Readers see either the old file or the complete new one.
    pub fn promote(&self, tmp: NamedTempFile, local_path: &Path) -> Result<()> {
        tmp.as_file()
            .sync_all()
            .io_context(|| "Failed to flush download")?;

        tmp.persist(local_path).map_err(|e| {
            FastGcsError::io(format!("Failed to persist cache file: {:?}", local_path), e.error)
        })?;
        Ok(())
    }

    /// All cached objects, skipping sidecars, lock files and temp files
    pub fn entries(&self) -> Result<Vec<CachedObject>> {
        let read_dir = fs::read_dir(&self.cache_dir)
            .io_context(|| format!("Failed to list cache directory: {:?}", self.cache_dir))?;

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let last_used = metadata
                .accessed()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push(CachedObject {
                path: entry.path(),
                size: metadata.len(),
                last_used,
            });
        }

        Ok(entries)
    }

    /// Remove the objects `policy` selects, together with their sidecars
    ///
    /// Returns the number of objects removed.
    pub fn evict(&self, policy: &dyn EvictionPolicy) -> Result<usize> {
        let entries = self.entries()?;
        let selected = policy.select(&entries);
        if selected.is_empty() {
            return Ok(0);
        }

        info!(count = selected.len(), "Evicting cached objects");

        let mut removed = 0;
        for path in selected {
            // hold the key lock so an in-flight fetch finishes first
            let _lock = KeyLock::acquire(&Self::lock_path(&path))?;
            match remove_if_exists(&path).and_then(|_| remove_if_exists(&Self::sidecar_path(&path))) {
                Ok(()) => {
                    debug!(path = %path.display(), "Evicted cached file");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to evict cached file"),
            }
        }

        Ok(removed)
    }

    /// Remove temp files older than `max_age`; returns how many were removed
    pub fn cleanup_stale(&self, max_age: Duration) -> usize {
        let Ok(read_dir) = fs::read_dir(&self.cache_dir) else {
            return 0;
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in read_dir.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(DOWNLOAD_PREFIX) || name.starts_with(SIDECAR_TMP_PREFIX)) {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if matches!(age, Some(age) if age >= max_age) {
                debug!(path = %entry.path().display(), "Removing stale temp file");
                if fs::remove_file(entry.path()).is_ok() {
                    removed += 1;
                }
            }
        }

        removed
    }
}

/// `<dir>/.<file name>.<ext>`
fn dot_sibling(local_path: &Path, ext: &str) -> PathBuf {
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    local_path.with_file_name(format!(".{}.{}", name, ext))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).io_context(|| format!("Failed to remove {:?}", path)),
    }
}
