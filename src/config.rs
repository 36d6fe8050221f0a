//! Runtime configuration
//!
//! Resolves cache and credential locations from the environment, falling back
//! to the platform directories.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FastGcsError, Result};

/// File name of the durable token cache inside the SDK config directory
pub const TOKEN_CACHE_BASENAME: &str = "com.shopify.fastgcs.json";

/// SDK database holding recently minted access tokens
pub const SDK_ACCESS_TOKENS_DB: &str = "access_tokens.db";

/// SDK database holding long-lived user credentials
pub const SDK_CREDENTIALS_DB: &str = "credentials.db";

const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Locations and endpoints used by a [`crate::FastGcs`] instance
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding cached objects and their sidecars
    pub cache_root: PathBuf,
    /// Cloud SDK configuration directory (e.g. `~/.config/gcloud`)
    pub sdk_config_dir: PathBuf,
    /// Path of the durable token cache file
    pub token_cache_path: PathBuf,
    /// Base URL of the storage JSON API
    pub storage_base_url: String,
    /// OAuth2 token endpoint used for the refresh exchange
    pub token_url: String,
}

impl Config {
    /// Build configuration from environment variables and platform defaults
    ///
    /// Honors `FASTGCS_CACHE_DIR`, `CLOUDSDK_CONFIG`, `FASTGCS_STORAGE_URL`
    /// and `FASTGCS_TOKEN_URL`.
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            FastGcsError::io(
                "Failed to locate home directory",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"),
            )
        })?;

        let cache_root = env_path("FASTGCS_CACHE_DIR").unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| home.join(".cache"))
                .join("fastgcs")
        });

        // gcloud keeps ~/.config/gcloud on every unix, not the platform config dir
        let sdk_config_dir = env_path("CLOUDSDK_CONFIG")
            .unwrap_or_else(|| home.join(".config").join("gcloud"));

        Ok(Self {
            token_cache_path: sdk_config_dir.join(TOKEN_CACHE_BASENAME),
            cache_root,
            sdk_config_dir,
            storage_base_url: env::var("FASTGCS_STORAGE_URL")
                .unwrap_or_else(|_| DEFAULT_STORAGE_URL.to_string()),
            token_url: env::var("FASTGCS_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
        })
    }

    /// Self-contained configuration under a single directory
    ///
    /// Uses `<root>/cache` for objects and `<root>/gcloud` as the SDK directory.
    pub fn with_root(root: &Path) -> Self {
        let sdk_config_dir = root.join("gcloud");
        Self {
            cache_root: root.join("cache"),
            token_cache_path: sdk_config_dir.join(TOKEN_CACHE_BASENAME),
            sdk_config_dir,
            storage_base_url: DEFAULT_STORAGE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }

    /// Point both remote endpoints at a different host (used for mock servers)
    pub fn with_endpoints(mut self, storage_base_url: &str, token_url: &str) -> Self {
        self.storage_base_url = storage_base_url.trim_end_matches('/').to_string();
        self.token_url = token_url.to_string();
        self
    }

    /// Path of the SDK access-token database
    pub fn sdk_access_tokens_db(&self) -> PathBuf {
        self.sdk_config_dir.join(SDK_ACCESS_TOKENS_DB)
    }

    /// Path of the SDK credentials database
    pub fn sdk_credentials_db(&self) -> PathBuf {
        self.sdk_config_dir.join(SDK_CREDENTIALS_DB)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_root_layout() {
        let config = Config::with_root(Path::new("/tmp/fg"));
        assert_eq!(config.cache_root, PathBuf::from("/tmp/fg/cache"));
        assert_eq!(
            config.token_cache_path,
            PathBuf::from("/tmp/fg/gcloud/com.shopify.fastgcs.json")
        );
        assert_eq!(
            config.sdk_credentials_db(),
            PathBuf::from("/tmp/fg/gcloud/credentials.db")
        );
        assert_eq!(config.storage_base_url, "https://storage.googleapis.com");
    }

    #[test]
    fn test_with_endpoints_trims_slash() {
        let config = Config::with_root(Path::new("/tmp/fg"))
            .with_endpoints("http://127.0.0.1:9000/", "http://127.0.0.1:9000/token");
        assert_eq!(config.storage_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.token_url, "http://127.0.0.1:9000/token");
    }
}
