//! Integration tests for the changes feed
//!
//! - Start page token retrieval
//! - Page parsing, cursor continuation and the final checkpoint
//! - Query parameters sent to `changes.list`
//! - Error statuses surfacing as feed failures

use drivesync_core::{domain::ChangeCursor, ports::IChangeFeed};
use drivesync_drive::changes::CHANGE_FIELDS;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn cursor(value: &str) -> ChangeCursor {
    ChangeCursor::new(value.to_string()).unwrap()
}

#[tokio::test]
async fn test_current_position_reads_start_page_token() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .and(query_param("supportsAllDrives", "true"))
        .and(header("authorization", format!("Bearer {}", common::TOKEN).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "drive#startPageToken",
                "startPageToken": "4521"
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let position = provider.current_position().await.unwrap();
    assert_eq!(position.as_str(), "4521");
}

#[tokio::test]
async fn test_current_position_missing_token_is_error() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    assert!(provider.current_position().await.is_err());
}

#[tokio::test]
async fn test_list_page_sends_feed_parameters() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/changes"))
        .and(query_param("pageToken", "100"))
        .and(query_param("spaces", "drive"))
        .and(query_param("includeItemsFromAllDrives", "true"))
        .and(query_param("supportsAllDrives", "true"))
        .and(query_param("includeRemoved", "true"))
        .and(query_param("pageSize", "100"))
        .and(query_param("fields", CHANGE_FIELDS))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "changes": [], "newStartPageToken": "101" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = provider.list_page(&cursor("100")).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.new_checkpoint.unwrap().as_str(), "101");
}

#[tokio::test]
async fn test_pages_chain_to_checkpoint() {
    let (server, provider) = common::setup_drive_mock().await;

    common::mount_changes_page(
        &server,
        "100",
        serde_json::json!({
            "nextPageToken": "150",
            "changes": [
                {
                    "fileId": "doc-1",
                    "removed": false,
                    "file": {
                        "id": "doc-1",
                        "name": "Plan",
                        "mimeType": "application/vnd.google-apps.document",
                        "modifiedTime": "2024-06-01T12:00:00.000Z",
                        "parents": ["folder-1"]
                    }
                },
                {
                    "fileId": "sc-1",
                    "file": {
                        "id": "sc-1",
                        "name": "Plan link",
                        "mimeType": "application/vnd.google-apps.shortcut",
                        "shortcutDetails": { "targetId": "doc-1" }
                    }
                }
            ]
        }),
    )
    .await;
    common::mount_changes_page(
        &server,
        "150",
        serde_json::json!({
            "newStartPageToken": "160",
            "changes": [{ "fileId": "old-1", "removed": true }]
        }),
    )
    .await;

    let first = provider.list_page(&cursor("100")).await.unwrap();
    assert_eq!(first.records.len(), 2);
    assert!(first.new_checkpoint.is_none());
    let doc = first.records[0].file.as_ref().unwrap();
    assert_eq!(doc.mime_type, "application/vnd.google-apps.document");
    assert_eq!(doc.primary_parent(), Some("folder-1"));
    let shortcut = first.records[1].file.as_ref().unwrap();
    assert_eq!(shortcut.shortcut_target_id.as_deref(), Some("doc-1"));

    let next = first.next_cursor.unwrap();
    let second = provider.list_page(&next).await.unwrap();
    assert!(second.next_cursor.is_none());
    assert_eq!(second.new_checkpoint.unwrap().as_str(), "160");
    assert!(second.records[0].removed);
    assert_eq!(second.records[0].id(), Some("old-1"));
}

#[tokio::test]
async fn test_invalid_page_token_is_error() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(400).set_body_json(common::error_body(
            400,
            "invalid",
            "Invalid Value",
        )))
        .mount(&server)
        .await;

    let err = provider.list_page(&cursor("bogus")).await.unwrap_err();
    assert!(format!("{err:#}").contains("bogus"));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (server, provider) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::error_body(
            401,
            "authError",
            "Invalid Credentials",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider.list_page(&cursor("100")).await.unwrap_err();
    assert!(format!("{err:#}").contains("Invalid Credentials"));
}
