//! fastgcs Error Types
//!
//! Structured error handling for reference parsing, credential resolution and
//! conditional fetches. Maps HTTP status codes to variants callers can use for
//! their own retry decisions; the library itself never retries.

use std::path::PathBuf;

/// Errors surfaced by fastgcs operations
#[derive(Debug, thiserror::Error)]
pub enum FastGcsError {
    #[error("invalid GCS URL: {0}")]
    InvalidReference(String),

    #[error("couldn't obtain access token: {0}")]
    CredentialUnavailable(String),

    #[error("token cache {path:?} is corrupt: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("remote fetch failed ({status}): {body}")]
    RemoteFetch { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Library result alias
pub type Result<T> = std::result::Result<T, FastGcsError>;

impl FastGcsError {
    /// Wrap an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        FastGcsError::LocalIo {
            context: context.into(),
            source,
        }
    }

    /// Whether a caller-side retry has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            FastGcsError::Network(_) => true,
            FastGcsError::RemoteFetch { status, .. } => {
                matches!(status, 408 | 429 | 500..=599)
            }
            _ => false,
        }
    }

    /// HTTP status of a failed remote fetch, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FastGcsError::RemoteFetch { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FastGcsError {
    fn from(err: reqwest::Error) -> Self {
        FastGcsError::Network(err.to_string())
    }
}

/// Extension for attaching context to I/O results, in the style of anyhow's `Context`
pub(crate) trait IoContext<T> {
    fn io_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| FastGcsError::io(f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let server = FastGcsError::RemoteFetch {
            status: 503,
            body: String::new(),
        };
        assert!(server.is_retryable());
        assert_eq!(server.status(), Some(503));

        let missing = FastGcsError::RemoteFetch {
            status: 404,
            body: "No such object".to_string(),
        };
        assert!(!missing.is_retryable());

        // a rejected token fails the same way until it is replaced
        let unauthorized = FastGcsError::RemoteFetch {
            status: 401,
            body: "Invalid Credentials".to_string(),
        };
        assert!(!unauthorized.is_retryable());
        assert!(FastGcsError::RemoteFetch { status: 429, body: String::new() }.is_retryable());

        assert!(FastGcsError::Network("connection refused".to_string()).is_retryable());
        assert!(!FastGcsError::InvalidReference("nope".to_string()).is_retryable());
        assert!(!FastGcsError::CredentialUnavailable("none".to_string()).is_retryable());
    }

    #[test]
    fn test_io_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.io_context(|| "Failed to create cache directory").unwrap_err();
        assert!(matches!(err, FastGcsError::LocalIo { .. }));
        assert!(err.to_string().starts_with("Failed to create cache directory"));
    }
}
