//! Integration tests for the refresh-token provider
//!
//! The OAuth token endpoint is mocked; the Drive client must send the
//! access token the provider obtained.

use std::sync::Arc;

use drivesync_core::ports::ICredentialProvider;
use drivesync_drive::{
    auth::{OAuthClientConfig, RefreshTokenProvider},
    client::DriveClient,
    files,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_token(server: &MockServer, access_token: &str, expires_in: u64, times: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": expires_in,
            "scope": "https://www.googleapis.com/auth/drive.readonly"
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> RefreshTokenProvider {
    let config = OAuthClientConfig::new("client-id", Some("client-secret".to_string()))
        .with_token_url(format!("{}/token", server.uri()));
    RefreshTokenProvider::new(&config, "1//refresh").unwrap()
}

#[tokio::test]
async fn test_access_token_cached_until_near_expiry() {
    let server = MockServer::start().await;
    mount_token(&server, "ya29.fresh", 3600, 1).await;

    let provider = provider(&server);
    let first = provider.get_credential().await.unwrap();
    let second = provider.get_credential().await.unwrap();

    assert_eq!(first.access_token, "ya29.fresh");
    assert_eq!(second.access_token, "ya29.fresh");
    assert!(first.expires_at.is_some());
}

#[tokio::test]
async fn test_short_lived_token_refreshed_each_time() {
    let server = MockServer::start().await;
    mount_token(&server, "ya29.short", 30, 2).await;

    let provider = provider(&server);
    provider.get_credential().await.unwrap();
    provider.get_credential().await.unwrap();
}

#[tokio::test]
async fn test_token_endpoint_rejection_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    assert!(provider(&server).get_credential().await.is_err());
}

#[tokio::test]
async fn test_client_sends_refreshed_token() {
    let server = MockServer::start().await;
    mount_token(&server, "ya29.drive", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/files/f1"))
        .and(header("authorization", "Bearer ya29.drive"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(2)
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(Arc::new(provider(&server)), server.uri());
    assert_eq!(files::download(&client, "f1").await.unwrap(), b"ok");
    assert_eq!(files::download(&client, "f1").await.unwrap(), b"ok");
}
