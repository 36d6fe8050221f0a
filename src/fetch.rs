//! Conditional Fetcher
//!
//! Brings the local copy of an object up to date: revalidate with the stored
//! ETag, and on new content stream it to a temp file, rename it over the
//! cached path, then record the new ETag. The sidecar is only written after
//! the rename, so a crash in between costs at most one redundant download.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Response;
use tracing::{debug, info};

use crate::auth::AccessToken;
use crate::cache::ObjectCache;
use crate::error::{FastGcsError, IoContext, Result};
use crate::gcs::{ObjectReference, ObjectResponse, StorageClient};

/// Counters for fetch outcomes
#[derive(Debug, Default)]
pub struct FetchStats {
    not_modified: AtomicU64,
    downloaded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`FetchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    /// 304 responses: the cached copy was current
    pub not_modified: u64,
    /// 200 responses: new content was written
    pub downloaded: u64,
    /// Fetches that returned an error
    pub failed: u64,
}

impl FetchStats {
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            not_modified: self.not_modified.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Keeps the object cache in sync with remote objects
pub struct ConditionalFetcher {
    client: StorageClient,
    cache: ObjectCache,
    stats: FetchStats,
}

impl ConditionalFetcher {
    pub fn new(client: StorageClient, cache: ObjectCache) -> Self {
        Self {
            client,
            cache,
            stats: FetchStats::default(),
        }
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Revalidate or download `reference`, returning the current local path
    ///
    /// # Arguments
    /// * `reference` - Object to bring up to date
    /// * `token` - Bearer token for the storage API
    ///
    /// # Returns
    /// Path to the local cached file. On error the existing cached file, if
    /// any, is left untouched.
    pub async fn materialize(
        &self,
        reference: &ObjectReference,
        token: &AccessToken,
    ) -> Result<PathBuf> {
        let result = self.update(reference, token).await;
        if result.is_err() {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn update(&self, reference: &ObjectReference, token: &AccessToken) -> Result<PathBuf> {
        let local_path = self.cache.path_for(reference);

        // held until return, whichever way we leave
        let _lock = self.cache.lock(&local_path).await?;

        let etag = self.cache.revalidation_etag(&local_path)?;

        match self.client.get_object(reference, token, etag.as_deref()).await? {
            ObjectResponse::NotModified => {
                if etag.is_none() {
                    // we never asked for revalidation, so there is nothing to reuse
                    return Err(FastGcsError::RemoteFetch {
                        status: 304,
                        body: "not modified, but no cached copy exists".to_string(),
                    });
                }
                self.stats.not_modified.fetch_add(1, Ordering::Relaxed);
                debug!(object = %reference, local = %local_path.display(), "File cache HIT");
                Ok(local_path)
            }
            ObjectResponse::Content {
                etag: new_etag,
                response,
            } => {
                debug!(object = %reference, had_etag = etag.is_some(), "File cache MISS, downloading");

                let mut tmp = self.cache.begin_download()?;
                let size = write_body(response, &mut tmp).await?;
                self.cache.promote(tmp, &local_path)?;

                match &new_etag {
                    Some(new_etag) => self.cache.write_etag(&local_path, new_etag)?,
                    None => self.cache.remove_etag(&local_path)?,
                }

                self.stats.downloaded.fetch_add(1, Ordering::Relaxed);
                info!(
                    object = %reference,
                    local = %local_path.display(),
                    size = size,
                    etag = ?new_etag,
                    "Downloaded object"
                );
                Ok(local_path)
            }
        }
    }
}

/// Stream a response body into `out`, returning the byte count
async fn write_body<W: Write>(mut response: Response, out: &mut W) -> Result<u64> {
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk)
            .io_context(|| "Failed to write download")?;
        written += chunk.len() as u64;
    }
    out.flush().io_context(|| "Failed to write download")?;
    Ok(written)
}
