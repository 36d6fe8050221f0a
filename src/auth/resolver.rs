//! Credential Resolver
//!
//! Walks the credential sources in order until one yields a usable token,
//! then persists it to the durable cache so the next call (and the next
//! process) takes the cheap path.

use std::sync::{PoisonError, RwLock};

use reqwest::Client;
use tracing::{debug, info, warn};

use super::refresh::RefreshExchange;
use super::sdk_store::SdkTokenStore;
use super::token::{AccessToken, CredentialRecord};
use super::token_cache::TokenCache;
use crate::config::Config;
use crate::error::{FastGcsError, Result};

/// A place an access token can come from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Our own JSON token cache
    DurableCache(TokenCache),
    /// Best-effort scan of the Cloud SDK's token database
    LocalSdkStore(SdkTokenStore),
    /// Refresh-token exchange against the OAuth2 endpoint
    NetworkRefresh(RefreshExchange),
}

impl CredentialSource {
    pub fn name(&self) -> &'static str {
        match self {
            CredentialSource::DurableCache(_) => "durable cache",
            CredentialSource::LocalSdkStore(_) => "SDK token store",
            CredentialSource::NetworkRefresh(_) => "token refresh",
        }
    }

    /// Try this source once
    ///
    /// `Ok(None)` means the source has nothing usable to offer.
    pub async fn fetch(&self, http_client: &Client) -> Result<Option<AccessToken>> {
        match self {
            CredentialSource::DurableCache(cache) => {
                Ok(cache.load()?.filter(AccessToken::is_usable))
            }
            CredentialSource::LocalSdkStore(store) => store.load(),
            CredentialSource::NetworkRefresh(exchange) => exchange.refresh(http_client).await,
        }
    }

    /// Tokens from anywhere but the durable cache get written back to it
    fn needs_persist(&self) -> bool {
        !matches!(self, CredentialSource::DurableCache(_))
    }
}

/// Resolves and holds the access token for one [`crate::FastGcs`] instance
pub struct CredentialResolver {
    /// HTTP client for the refresh exchange
    http_client: Client,
    /// Sources in resolution order
    sources: Vec<CredentialSource>,
    /// Where resolved tokens are persisted
    token_cache: TokenCache,
    /// Last resolved token, replaced wholesale on refresh
    current: RwLock<Option<AccessToken>>,
}

impl CredentialResolver {
    pub fn new(http_client: Client, token_cache: TokenCache, sources: Vec<CredentialSource>) -> Self {
        Self {
            http_client,
            sources,
            token_cache,
            current: RwLock::new(None),
        }
    }

    /// The standard order: durable cache, SDK token store, refresh exchange
    ///
    /// `record` is the SDK credential record, read once by the caller.
    pub fn standard(http_client: Client, config: &Config, record: Option<CredentialRecord>) -> Self {
        let token_cache = TokenCache::new(&config.token_cache_path);
        let sources = vec![
            CredentialSource::DurableCache(token_cache.clone()),
            CredentialSource::LocalSdkStore(SdkTokenStore::new(config.sdk_access_tokens_db())),
            CredentialSource::NetworkRefresh(RefreshExchange::new(&config.token_url, record)),
        ];
        Self::new(http_client, token_cache, sources)
    }

    /// Return a token that is valid right now, resolving a new one if needed
    pub async fn ensure_token(&self) -> Result<AccessToken> {
        if let Some(token) = self.current_token().filter(AccessToken::is_usable) {
            return Ok(token);
        }

        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.fetch(&self.http_client).await {
                Ok(Some(token)) if token.is_usable() => {
                    if source.needs_persist() {
                        self.token_cache.store(&token)?;
                    }
                    info!(source = source.name(), expiry = %token.expires_at, "Resolved access token");
                    *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
                    return Ok(token);
                }
                Ok(Some(token)) => {
                    debug!(source = source.name(), expiry = %token.expires_at, "Token already expired");
                    failures.push(format!("{}: token already expired", source.name()));
                }
                Ok(None) => {
                    debug!(source = source.name(), "No token available");
                    failures.push(format!("{}: not available", source.name()));
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Credential source failed");
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(FastGcsError::CredentialUnavailable(failures.join("; ")))
    }

    /// The in-memory token, whether or not it is still valid
    pub fn current_token(&self) -> Option<AccessToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the in-memory token; the next call re-walks the sources
    pub fn invalidate(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }
}
