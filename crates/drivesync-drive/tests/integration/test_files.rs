//! Integration tests for metadata lookups, downloads and exports

use drivesync_core::ports::{IContentTransport, IMetadataProvider};
use drivesync_drive::{files, DriveError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_get_metadata_returns_file() {
    let (server, provider) = common::setup_drive_mock().await;

    common::mount_metadata(
        &server,
        "folder-1",
        serde_json::json!({
            "id": "folder-1",
            "name": "Projects",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root-id"]
        }),
    )
    .await;

    let meta = provider.get_metadata("folder-1").await.unwrap().unwrap();
    assert!(meta.is_folder());
    assert_eq!(meta.name, "Projects");
    assert_eq!(meta.primary_parent(), Some("root-id"));
}

#[tokio::test]
async fn test_get_metadata_not_found_is_absent() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(common::error_body(
            404,
            "notFound",
            "File not found: missing.",
        )))
        .mount(&server)
        .await;

    assert!(provider.get_metadata("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_metadata_forbidden_is_error() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/locked"))
        .respond_with(ResponseTemplate::new(403).set_body_json(common::error_body(
            403,
            "insufficientFilePermissions",
            "The user does not have sufficient permissions for this file.",
        )))
        .mount(&server)
        .await;

    assert!(provider.get_metadata("locked").await.is_err());
}

#[tokio::test]
async fn test_download_returns_content() {
    let (server, provider) = common::setup_drive_mock().await;

    let content: Vec<u8> = (0..65_536).map(|i| (i % 251) as u8).collect();
    common::mount_download(&server, "bin-1", &content).await;

    let data = provider.download("bin-1").await.unwrap();
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_empty_file() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_download(&server, "empty-1", &[]).await;

    assert!(provider.download("empty-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_export_requests_target_mime() {
    let (server, provider) = common::setup_drive_mock().await;
    let docx = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    Mock::given(method("GET"))
        .and(path("/files/doc-1/export"))
        .and(query_param("mimeType", docx))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04docx".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let data = provider.export("doc-1", docx).await.unwrap();
    assert!(data.starts_with(b"PK"));
}

#[tokio::test]
async fn test_export_of_non_native_is_forbidden() {
    let server = wiremock::MockServer::start().await;
    let client = common::client(&server);

    Mock::given(method("GET"))
        .and(path("/files/pdf-1/export"))
        .respond_with(ResponseTemplate::new(403).set_body_json(common::error_body(
            403,
            "fileNotExportable",
            "Export only supports Docs Editors files.",
        )))
        .mount(&server)
        .await;

    let err = files::export(&client, "pdf-1", "application/pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Forbidden(_)));
}
