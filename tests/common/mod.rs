//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;

use fastgcs::auth::TokenCache;
use fastgcs::{AccessToken, Config, FastGcs};
use tempfile::TempDir;
use wiremock::MockServer;

pub const CACHED_TOKEN: &str = "ya29.cached-token";

/// Config rooted in a fresh temp dir, pointed at the mock server
pub fn config_for(server: &MockServer) -> (TempDir, Config) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::with_root(dir.path())
        .with_endpoints(&server.uri(), &format!("{}/token", server.uri()));
    (dir, config)
}

/// Seed the durable token cache with a token valid for an hour
pub fn seed_token(config: &Config) -> AccessToken {
    let token = AccessToken::expiring_in(CACHED_TOKEN, 3600);
    TokenCache::new(&config.token_cache_path)
        .store(&token)
        .expect("store token");
    token
}

/// Write an SDK credential store the refresh exchange can use
pub fn seed_credentials(config: &Config) {
    fs::create_dir_all(&config.sdk_config_dir).expect("sdk dir");
    let mut db = b"SQLite format 3\x00\x10\x00\x01\x01".to_vec();
    db.extend_from_slice(b"\x00\x00\x2a\x03dev@example.com");
    db.extend_from_slice(
        br#"{"client_id": "cid.apps.googleusercontent.com", "client_secret": "csecret", "refresh_token": "1//refresh", "type": "authorized_user"}"#,
    );
    fs::write(config.sdk_credentials_db(), db).expect("write credentials.db");
}

/// Client with a cached token, ready to fetch
pub async fn ready_client(server: &MockServer) -> (TempDir, FastGcs) {
    let (dir, config) = config_for(server);
    seed_token(&config);
    let fg = FastGcs::new(config).expect("client");
    (dir, fg)
}
