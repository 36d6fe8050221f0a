//! OAuth2 refresh-token exchange

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::token::{AccessToken, CredentialRecord};
use crate::error::{FastGcsError, Result};

/// Request body for the token endpoint
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'static str,
}

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    /// Lifetime in seconds
    expires_in: i64,
}

/// Mints access tokens from a long-lived credential record
#[derive(Debug, Clone)]
pub struct RefreshExchange {
    token_url: String,
    record: Option<CredentialRecord>,
}

impl RefreshExchange {
    /// `record` is read once by the caller; `None` disables this source
    pub fn new(token_url: &str, record: Option<CredentialRecord>) -> Self {
        Self {
            token_url: token_url.to_string(),
            record,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.record.is_some()
    }

    /// Exchange the refresh token for a new access token
    ///
    /// Returns `Ok(None)` when no credential record is available.
    pub async fn refresh(&self, http_client: &Client) -> Result<Option<AccessToken>> {
        let Some(record) = &self.record else {
            debug!("No SDK credentials available for token refresh");
            return Ok(None);
        };

        info!(client_id = %record.client_id, "Refreshing access token...");

        let request = RefreshRequest {
            client_id: &record.client_id,
            client_secret: &record.client_secret,
            refresh_token: &record.refresh_token,
            grant_type: "refresh_token",
        };

        let response = http_client
            .post(&self.token_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FastGcsError::RemoteFetch { status, body });
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| FastGcsError::Network(format!("Failed to parse token response: {}", e)))?;

        // a lifetime we can't represent is as useless as a malformed response
        let expires_in = refreshed.expires_in;
        let token = match expires_in {
            secs if secs > 0 => AccessToken::try_expiring_in(refreshed.access_token, secs),
            _ => None,
        }
        .ok_or_else(|| {
            FastGcsError::Network(format!("Invalid expires_in in token response: {}", expires_in))
        })?;
        info!(expiry = %token.expires_at, "Access token refreshed successfully");
        Ok(Some(token))
    }
}
