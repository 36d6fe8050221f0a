//! Cloud Storage JSON API Client
//!
//! Issues conditional media downloads against the storage endpoint.

use reqwest::header::{AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use super::reference::ObjectReference;
use crate::auth::AccessToken;
use crate::error::{FastGcsError, Result};

/// Outcome of a conditional object GET
#[derive(Debug)]
pub enum ObjectResponse {
    /// 304: the caller's ETag is still current
    NotModified,
    /// 200: new content; the body has not been read yet
    Content {
        etag: Option<String>,
        response: Response,
    },
}

/// Storage API client bound to one endpoint
#[derive(Clone)]
pub struct StorageClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Endpoint base, e.g. `https://storage.googleapis.com`
    base_url: String,
}

impl StorageClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Media download URL for an object
    pub fn object_url(&self, reference: &ObjectReference) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base_url,
            urlencoding::encode(&reference.bucket),
            urlencoding::encode(&reference.key)
        )
    }

    /// GET an object, revalidating against `etag` when one is known
    ///
    /// Any status other than 200 or 304 is returned as `RemoteFetch`.
    pub async fn get_object(
        &self,
        reference: &ObjectReference,
        token: &AccessToken,
        etag: Option<&str>,
    ) -> Result<ObjectResponse> {
        let url = self.object_url(reference);
        debug!(object = %reference, url = %url, etag = ?etag, "Fetching object");

        let mut request = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, token.bearer_header());

        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(ObjectResponse::NotModified),
            StatusCode::OK => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Ok(ObjectResponse::Content { etag, response })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(FastGcsError::RemoteFetch {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
