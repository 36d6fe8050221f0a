//! `gs://` reference parsing

use std::fmt;
use std::str::FromStr;

use crate::error::{FastGcsError, Result};

/// URI scheme of Cloud Storage references
pub const SCHEME: &str = "gs://";

/// A bucket/key pair parsed from `gs://<bucket>/<key>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    pub bucket: String,
    pub key: String,
}

impl ObjectReference {
    /// Parse a `gs://<bucket>/<key>` reference
    ///
    /// The bucket is the first path segment; the key is everything after the
    /// following `/`, slashes included, without decoding or normalization.
    /// The key may not span lines.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || FastGcsError::InvalidReference(reference.to_string());

        let rest = reference.strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;

        // a leading '.' would put the cached file among the cache's own dot-files
        if bucket.is_empty() || bucket.starts_with('.') || key.contains('\n') {
            return Err(invalid());
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl FromStr for ObjectReference {
    type Err = FastGcsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.bucket, self.key)
    }
}
