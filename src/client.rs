//! fastgcs client
//!
//! Ties the pieces together: parse the reference, make sure a token is
//! valid, bring the cached copy up to date, then hand it to the caller.

use std::fs::File;
use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{debug, warn};

use crate::auth::{AccessToken, CredentialResolver, SdkCredentialStore};
use crate::cache::ObjectCache;
use crate::config::Config;
use crate::error::{FastGcsError, IoContext, Result};
use crate::fetch::{ConditionalFetcher, FetchStatsSnapshot};
use crate::gcs::{ObjectReference, StorageClient};

/// Cached, credential-reusing reader for `gs://` objects
pub struct FastGcs {
    config: Config,
    resolver: CredentialResolver,
    fetcher: ConditionalFetcher,
}

impl FastGcs {
    /// Build a client from `config`
    ///
    /// Creates the cache root and reads the SDK credential record once.
    pub fn new(config: Config) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("fastgcs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FastGcsError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let cache = ObjectCache::open(&config.cache_root)?;

        let record = match SdkCredentialStore::new(config.sdk_credentials_db()).load() {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to read SDK credentials, token refresh disabled");
                None
            }
        };
        debug!(has_credentials = record.is_some(), "Loaded SDK credentials");

        let resolver = CredentialResolver::standard(http_client.clone(), &config, record);
        let fetcher = ConditionalFetcher::new(
            StorageClient::new(http_client, &config.storage_base_url),
            cache,
        );

        Ok(Self::with_parts(config, resolver, fetcher))
    }

    /// Build a client from the environment (see [`Config::from_env`])
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Assemble a client from custom parts, e.g. a resolver with other sources
    pub fn with_parts(config: Config, resolver: CredentialResolver, fetcher: ConditionalFetcher) -> Self {
        Self {
            config,
            resolver,
            fetcher,
        }
    }

    /// A token valid right now
    pub async fn ensure_token(&self) -> Result<AccessToken> {
        self.resolver.ensure_token().await
    }

    /// Bring the cached copy of `gs_url` up to date and return its path
    ///
    /// A 401 from the storage API drops the in-memory token, so the next call
    /// resolves credentials again instead of resending the rejected one.
    pub async fn materialize(&self, gs_url: &str) -> Result<PathBuf> {
        let reference = ObjectReference::parse(gs_url)?;
        let token = self.resolver.ensure_token().await?;
        let result = self.fetcher.materialize(&reference, &token).await;
        if let Err(FastGcsError::RemoteFetch { status: 401, .. }) = &result {
            warn!(object = %reference, "Access token rejected, discarding it");
            self.resolver.invalidate();
        }
        result
    }

    /// Open the current copy of an object for reading
    pub async fn open(&self, gs_url: &str) -> Result<File> {
        let path = self.materialize(gs_url).await?;
        File::open(&path).io_context(|| format!("Failed to open cached file: {:?}", path))
    }

    /// Copy the current copy of an object to `dest`, replacing its contents
    pub async fn copy(&self, gs_url: &str, dest: impl AsRef<Path>) -> Result<()> {
        let path = self.materialize(gs_url).await?;
        let dest = dest.as_ref();
        tokio::fs::copy(&path, dest)
            .await
            .io_context(|| format!("Failed to copy {:?} to {:?}", path, dest))?;
        Ok(())
    }

    /// Read the current copy of an object into memory
    pub async fn read(&self, gs_url: &str) -> Result<Vec<u8>> {
        let path = self.materialize(gs_url).await?;
        tokio::fs::read(&path)
            .await
            .io_context(|| format!("Failed to read cached file: {:?}", path))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &ObjectCache {
        self.fetcher.cache()
    }

    pub fn stats(&self) -> FetchStatsSnapshot {
        self.fetcher.stats()
    }

    /// Log current fetch counters
    pub fn log_metrics(&self) {
        let stats = self.stats();
        debug!(
            not_modified = stats.not_modified,
            downloaded = stats.downloaded,
            failed = stats.failed,
            "Fetch metrics"
        );
    }
}
