//! Per-key advisory locks
//!
//! Serializes fetchers of the same object, in this process or another, for
//! the whole revalidate/download/rename/sidecar sequence.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use tracing::trace;

use crate::error::{FastGcsError, IoContext, Result};

/// Exclusive `flock` on a lock file; released when dropped
pub struct KeyLock {
    _flock: Flock<File>,
    path: PathBuf,
}

impl KeyLock {
    /// Block until the lock at `path` is held, creating the file if needed
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .io_context(|| format!("Failed to open lock file: {:?}", path))?;

        let flock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            FastGcsError::io(format!("Failed to lock {:?}", path), errno.into())
        })?;

        trace!(path = %path.display(), "Acquired key lock");
        Ok(Self {
            _flock: flock,
            path: path.to_path_buf(),
        })
    }

    /// Acquire on the blocking pool so the async runtime keeps running
    pub async fn acquire_async(path: PathBuf) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::acquire(&path))
            .await
            .map_err(|e| {
                FastGcsError::io(
                    "Lock task failed",
                    std::io::Error::new(std::io::ErrorKind::Other, e),
                )
            })?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
