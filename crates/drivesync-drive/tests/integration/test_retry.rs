//! Integration tests for throttle and server-error handling

use std::time::Duration;

use drivesync_drive::{files, rate_limit::Endpoint, DriveError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

async fn mount_then_ok(server: &MockServer, failure: ResponseTemplate, failures: u64) {
    Mock::given(method("GET"))
        .and(path("/files/f1"))
        .respond_with(failure)
        .up_to_n_times(failures)
        .mount(server)
        .await;
    common::mount_download(server, "f1", b"payload").await;
}

#[tokio::test]
async fn test_429_retried_after_retry_after() {
    let server = MockServer::start().await;
    let (client, limiter) = common::limited_client(&server, 3);

    mount_then_ok(
        &server,
        ResponseTemplate::new(429).insert_header("Retry-After", "0"),
        2,
    )
    .await;

    let data = files::download(&client, "f1").await.unwrap();
    assert_eq!(data, b"payload");
    // two throttles halve the content bucket twice
    assert_eq!(limiter.effective_capacity(Endpoint::Content), Some(75));
}

#[tokio::test]
async fn test_403_rate_limit_reason_retried() {
    let server = MockServer::start().await;
    let (client, _) = common::limited_client(&server, 3);

    mount_then_ok(
        &server,
        ResponseTemplate::new(403)
            .insert_header("Retry-After", "0")
            .set_body_json(common::error_body(
                403,
                "userRateLimitExceeded",
                "User Rate Limit Exceeded",
            )),
        1,
    )
    .await;

    assert_eq!(files::download(&client, "f1").await.unwrap(), b"payload");
}

#[tokio::test]
async fn test_5xx_retried_with_backoff() {
    let server = MockServer::start().await;
    let client = common::client(&server);

    mount_then_ok(&server, ResponseTemplate::new(503), 2).await;

    assert_eq!(files::download(&client, "f1").await.unwrap(), b"payload");
}

#[tokio::test]
async fn test_retry_limit_exhausted() {
    let server = MockServer::start().await;
    let (client, _) = common::limited_client(&server, 2);

    Mock::given(method("GET"))
        .and(path("/files/f1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = files::download(&client, "f1").await.unwrap_err();
    assert!(matches!(err, DriveError::ServerError { status: 500, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_429_exhausted_reports_retry_after() {
    let server = MockServer::start().await;
    let (client, _) = common::limited_client(&server, 0);

    Mock::given(method("GET"))
        .and(path("/files/f1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "9"))
        .expect(1)
        .mount(&server)
        .await;

    match files::download(&client, "f1").await {
        Err(DriveError::TooManyRequests { retry_after }) => {
            assert_eq!(retry_after, Duration::from_secs(9));
        }
        other => panic!("unexpected {other:?}"),
    }
}
