//! Credential resolution against a mock OAuth2 endpoint

mod common;

use std::fs;

use common::{config_for, seed_credentials, seed_token, CACHED_TOKEN};
use fastgcs::auth::TokenCache;
use fastgcs::{AccessToken, FastGcs, FastGcsError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn refresh_mock(expected_calls: u64) -> Mock {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_json(serde_json::json!({
            "client_id": "cid.apps.googleusercontent.com",
            "client_secret": "csecret",
            "refresh_token": "1//refresh",
            "grant_type": "refresh_token"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
}

#[tokio::test]
async fn cached_token_is_reused_without_network() {
    let server = MockServer::start().await;
    refresh_mock(0).mount(&server).await;

    let (_dir, config) = config_for(&server);
    seed_credentials(&config);
    let seeded = seed_token(&config);

    let fg = FastGcs::new(config).unwrap();
    let token = fg.ensure_token().await.unwrap();

    assert_eq!(token, seeded);
    assert_eq!(token.value, CACHED_TOKEN);
    server.verify().await;
}

#[tokio::test]
async fn refresh_happens_once_and_is_persisted() {
    let server = MockServer::start().await;
    refresh_mock(1).mount(&server).await;

    let (_dir, config) = config_for(&server);
    seed_credentials(&config);

    let fg = FastGcs::new(config.clone()).unwrap();
    let first = fg.ensure_token().await.unwrap();
    let second = fg.ensure_token().await.unwrap();

    assert_eq!(first.value, "ya29.refreshed");
    assert_eq!(second, first);
    assert!(first.expires_at > chrono::Utc::now() + chrono::Duration::seconds(3500));

    let persisted = TokenCache::new(&config.token_cache_path).load().unwrap().unwrap();
    assert_eq!(persisted, first);

    // a later process picks the token up from disk
    let next_process = FastGcs::new(config).unwrap();
    assert_eq!(next_process.ensure_token().await.unwrap(), first);

    server.verify().await;
}

#[tokio::test]
async fn expired_cache_triggers_refresh() {
    let server = MockServer::start().await;
    refresh_mock(1).mount(&server).await;

    let (_dir, config) = config_for(&server);
    seed_credentials(&config);
    TokenCache::new(&config.token_cache_path)
        .store(&AccessToken::expiring_in("ya29.old", -5))
        .unwrap();

    let fg = FastGcs::new(config).unwrap();
    assert_eq!(fg.ensure_token().await.unwrap().value, "ya29.refreshed");
    server.verify().await;
}

#[tokio::test]
async fn sdk_store_token_preferred_over_refresh() {
    let server = MockServer::start().await;
    refresh_mock(0).mount(&server).await;

    let (_dir, config) = config_for(&server);
    seed_credentials(&config);
    fs::write(
        config.sdk_access_tokens_db(),
        b"\x00\x05dev@example.comya29.from-sdk2999-12-31 23:59:59.000000\x00",
    )
    .unwrap();

    let fg = FastGcs::new(config.clone()).unwrap();
    let token = fg.ensure_token().await.unwrap();

    assert_eq!(token.value, "ya29.from-sdk");
    let persisted = TokenCache::new(&config.token_cache_path).load().unwrap().unwrap();
    assert_eq!(persisted.value, "ya29.from-sdk");
    server.verify().await;
}

#[tokio::test]
async fn rejected_refresh_is_credential_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = config_for(&server);
    seed_credentials(&config);

    let fg = FastGcs::new(config.clone()).unwrap();
    match fg.ensure_token().await {
        Err(FastGcsError::CredentialUnavailable(reason)) => {
            assert!(reason.contains("token refresh: remote fetch failed (400)"), "{}", reason);
            assert!(reason.contains("invalid_grant"), "{}", reason);
        }
        other => panic!("expected CredentialUnavailable, got {:?}", other),
    }

    // nothing was written
    assert!(!config.token_cache_path.exists());
}

#[tokio::test]
async fn out_of_range_lifetime_falls_through_without_panicking() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.x",
            "expires_in": i64::MAX
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = config_for(&server);
    seed_credentials(&config);

    let fg = FastGcs::new(config.clone()).unwrap();
    match fg.ensure_token().await {
        Err(FastGcsError::CredentialUnavailable(reason)) => {
            assert!(reason.contains("Invalid expires_in"), "{}", reason);
        }
        other => panic!("expected CredentialUnavailable, got {:?}", other),
    }
    assert!(fg.resolver().current_token().is_none());
    assert!(!config.token_cache_path.exists());
    server.verify().await;
}

#[tokio::test]
async fn rejected_token_is_not_resent() {
    let server = MockServer::start().await;
    let object_path = "/storage/v1/b/bucket/o/key";
    Mock::given(method("GET"))
        .and(path(object_path))
        .and(header("Authorization", format!("Bearer {}", CACHED_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(object_path))
        .and(header("Authorization", "Bearer ya29.replacement"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = config_for(&server);
    seed_token(&config);
    let fg = FastGcs::new(config.clone()).unwrap();

    let err = fg.read("gs://bucket/key").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_retryable());
    assert!(fg.resolver().current_token().is_none());

    // another process put a good token in the durable cache meanwhile
    TokenCache::new(&config.token_cache_path)
        .store(&AccessToken::expiring_in("ya29.replacement", 3600))
        .unwrap();

    assert_eq!(fg.read("gs://bucket/key").await.unwrap(), b"fresh");
    server.verify().await;
}

#[tokio::test]
async fn no_credentials_anywhere() {
    let server = MockServer::start().await;
    let (_dir, config) = config_for(&server);

    let fg = FastGcs::new(config).unwrap();
    let err = fg.read("gs://bucket/key").await.unwrap_err();
    assert!(matches!(err, FastGcsError::CredentialUnavailable(_)));

    // no fetch was attempted without a token
    assert!(server.received_requests().await.unwrap().is_empty());
}
