//! Shared helpers for Drive API integration tests
//!
//! Each helper mounts the endpoints a test needs on a wiremock server and
//! returns a provider or client pointing at it.

use std::{sync::Arc, time::Duration};

use drivesync_drive::{
    auth::StaticTokenProvider,
    client::DriveClient,
    files::FILE_FIELDS,
    provider::DriveProvider,
    rate_limit::{AdaptiveRateLimiter, RateLimitConfig},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-access-token";

/// Client against `server` with fast 5xx backoff
pub fn client(server: &MockServer) -> DriveClient {
    DriveClient::with_base_url(Arc::new(StaticTokenProvider::new(TOKEN)), server.uri())
        .with_server_error_delay(Duration::from_millis(1))
}

/// Client with a rate limiter allowing `max_retries` retries
#[allow(dead_code)]
pub fn limited_client(server: &MockServer, max_retries: u32) -> (DriveClient, Arc<AdaptiveRateLimiter>) {
    let limiter = Arc::new(AdaptiveRateLimiter::new(
        RateLimitConfig::default().with_max_retries(max_retries),
    ));
    (client(server).with_rate_limiter(limiter.clone()), limiter)
}

/// Provider against a fresh mock server
pub async fn setup_drive_mock() -> (MockServer, DriveProvider) {
    let server = MockServer::start().await;
    let provider = DriveProvider::new(Arc::new(client(&server)));
    (server, provider)
}

/// Mounts `changes.list` for `page_token` returning `body`
pub async fn mount_changes_page(server: &MockServer, page_token: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/changes"))
        .and(query_param("pageToken", page_token))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts `files.get` for `id`
#[allow(dead_code)]
pub async fn mount_metadata(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .and(query_param("fields", FILE_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a binary download for `id`
#[allow(dead_code)]
pub async fn mount_download(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .and(query_param("alt", "media"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .insert_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

/// Drive-style JSON error body
pub fn error_body(code: u16, reason: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{ "domain": "global", "reason": reason, "message": message }]
        }
    })
}
