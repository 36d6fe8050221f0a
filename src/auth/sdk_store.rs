//! Cloud SDK state stores
//!
//! Thin file wrappers around the extractors in [`super::scrape`]. A missing
//! database means the SDK isn't installed or never logged in, which is not an
//! error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::scrape;
use super::token::{AccessToken, CredentialRecord};
use crate::error::{IoContext, Result};

/// The SDK's access-token database (`access_tokens.db`)
#[derive(Debug, Clone)]
pub struct SdkTokenStore {
    path: PathBuf,
}

impl SdkTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The freshest token in the store, if it has not expired yet
    pub fn load(&self) -> Result<Option<AccessToken>> {
        let Some(data) = read_optional(&self.path)? else {
            return Ok(None);
        };

        let token = scrape::extract_access_token(&data);
        match &token {
            Some(t) if t.is_usable() => {
                debug!(path = %self.path.display(), expiry = %t.expires_at, "Found SDK access token");
                Ok(token)
            }
            Some(t) => {
                debug!(path = %self.path.display(), expiry = %t.expires_at, "SDK access token expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// The SDK's credential database (`credentials.db`)
#[derive(Debug, Clone)]
pub struct SdkCredentialStore {
    path: PathBuf,
}

impl SdkCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// First complete refresh-token credential in the store
    pub fn load(&self) -> Result<Option<CredentialRecord>> {
        let Some(data) = read_optional(&self.path)? else {
            return Ok(None);
        };
        Ok(scrape::extract_credential_record(&data))
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).io_context(|| format!("Failed to read SDK store: {:?}", path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastGcsError;

    #[test]
    fn test_missing_stores_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SdkTokenStore::new(dir.path().join("access_tokens.db")).load().unwrap().is_none());
        assert!(SdkCredentialStore::new(dir.path().join("credentials.db")).load().unwrap().is_none());
    }

    #[test]
    fn test_token_store_filters_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access_tokens.db");

        fs::write(&path, b"\x00me@x.io ya29.stale2001-01-01 00:00:00\x00").unwrap();
        assert!(SdkTokenStore::new(&path).load().unwrap().is_none());

        fs::write(&path, b"\x00me@x.io ya29.fresh2999-01-01 00:00:00\x00").unwrap();
        let token = SdkTokenStore::new(&path).load().unwrap().unwrap();
        assert_eq!(token.value, "ya29.fresh");
    }

    #[test]
    fn test_unreadable_store_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory can't be read as a file
        let err = SdkTokenStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, FastGcsError::LocalIo { .. }));
    }

    #[test]
    fn test_credential_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.db");
        fs::write(
            &path,
            br#"SQLite format 3\x00...{"client_id": "cid", "client_secret": "cs", "refresh_token": "rt"}"#,
        )
        .unwrap();

        let record = SdkCredentialStore::new(&path).load().unwrap().unwrap();
        assert_eq!(record.client_id, "cid");
        assert_eq!(record.client_secret, "cs");
        assert_eq!(record.refresh_token, "rt");
    }
}
