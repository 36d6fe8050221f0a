//! Durable Token Cache
//!
//! A single JSON record on disk, readable only by its owner. Writes go to a
//! temp file in the same directory and are renamed into place, so readers see
//! either the previous record or the new one.

use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::token::AccessToken;
use crate::error::{FastGcsError, IoContext, Result};

/// Owner-only read/write
const TOKEN_CACHE_MODE: u32 = 0o600;

/// On-disk cache of the last resolved access token
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached token
    ///
    /// A missing file is `Ok(None)`. Any other read or parse failure is
    /// `CacheCorrupt`. Expiry is not checked here.
    pub fn load(&self) -> Result<Option<AccessToken>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.corrupt(e.to_string())),
        };

        let token = serde_json::from_slice(&data).map_err(|e| self.corrupt(e.to_string()))?;
        Ok(Some(token))
    }

    /// Replace the cached token atomically
    pub fn store(&self, token: &AccessToken) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent)
            .io_context(|| format!("Failed to create token cache directory: {:?}", parent))?;

        let data = serde_json::to_vec(token)
            .map_err(|e| FastGcsError::io("Failed to encode token", e.into()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".fastgcs-token-")
            .permissions(Permissions::from_mode(TOKEN_CACHE_MODE))
            .tempfile_in(parent)
            .io_context(|| "Failed to create temp file for token cache")?;

        tmp.write_all(&data)
            .io_context(|| "Failed to write token cache")?;
        tmp.as_file()
            .sync_all()
            .io_context(|| "Failed to flush token cache")?;

        tmp.persist(&self.path)
            .map_err(|e| FastGcsError::io(format!("Failed to persist token cache: {:?}", self.path), e.error))?;

        debug!(path = %self.path.display(), expiry = %token.expires_at, "Stored token in cache");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> FastGcsError {
        FastGcsError::CacheCorrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
