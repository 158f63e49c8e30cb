//! Drive changes feed
//!
//! ## Flow
//!
//! 1. [`get_start_page_token`] returns the current position of the feed
//! 2. [`list_changes`] fetches one page from a cursor
//! 3. `nextPageToken` continues the same run; `newStartPageToken` (last page
//!    only) is the position the next run resumes from
//!
//! See <https://developers.google.com/drive/api/reference/rest/v3/changes>

use drivesync_core::{
    domain::{ChangeCursor, ChangeRecord},
    ports::ChangePage,
};
use serde::Deserialize;
use tracing::debug;

use crate::{client::DriveClient, files::DriveFile, rate_limit::Endpoint, DriveError};

/// Projection requested from `changes.list`
pub const CHANGE_FIELDS: &str = "newStartPageToken,nextPageToken,changes(fileId,removed,file(id,name,mimeType,modifiedTime,trashed,parents,shortcutDetails))";

/// Default number of changes per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

// ============================================================================
// Drive API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPageTokenResponse {
    start_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeListResponse {
    #[serde(default)]
    changes: Vec<DriveChange>,
    next_page_token: Option<String>,
    new_start_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveChange {
    file_id: Option<String>,
    #[serde(default)]
    removed: bool,
    file: Option<DriveFile>,
}

// ============================================================================
// ChangeParser
// ============================================================================

/// Converts raw `changes.list` responses into port-level pages
pub struct ChangeParser;

impl ChangeParser {
    fn parse_change(change: DriveChange) -> ChangeRecord {
        let entity_id = change.file_id.filter(|id| !id.is_empty());
        let file = change
            .file
            .map(|file| file.into_file_meta(entity_id.as_deref()));
        ChangeRecord {
            entity_id,
            removed: change.removed,
            file,
        }
    }

    fn parse_token(field: &str, token: Option<String>) -> Result<Option<ChangeCursor>, DriveError> {
        match token {
            None => Ok(None),
            Some(raw) => ChangeCursor::new(raw)
                .map(Some)
                .map_err(|e| DriveError::InvalidResponse(format!("{field}: {e}"))),
        }
    }

    fn parse_page(response: ChangeListResponse) -> Result<ChangePage, DriveError> {
        Ok(ChangePage {
            next_cursor: Self::parse_token("nextPageToken", response.next_page_token)?,
            new_checkpoint: Self::parse_token("newStartPageToken", response.new_start_page_token)?,
            records: response
                .changes
                .into_iter()
                .map(Self::parse_change)
                .collect(),
        })
    }

    /// Parse a `changes.list` JSON body
    pub fn parse(body: &[u8]) -> Result<ChangePage, DriveError> {
        let response: ChangeListResponse = serde_json::from_slice(body)
            .map_err(|e| DriveError::InvalidResponse(format!("changes.list: {e}")))?;
        Self::parse_page(response)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Fetch the feed's current start page token
pub async fn get_start_page_token(client: &DriveClient) -> Result<ChangeCursor, DriveError> {
    let response: StartPageTokenResponse = client
        .get_json(
            "/changes/startPageToken",
            &[("supportsAllDrives", "true")],
            Endpoint::Changes,
        )
        .await?;

    let token = ChangeParser::parse_token("startPageToken", response.start_page_token)?
        .ok_or_else(|| DriveError::InvalidResponse("startPageToken missing".to_string()))?;
    debug!(cursor = %token, "Fetched start page token");
    Ok(token)
}

/// Fetch one page of changes starting at `cursor`
pub async fn list_changes(
    client: &DriveClient,
    cursor: &ChangeCursor,
    page_size: u32,
) -> Result<ChangePage, DriveError> {
    let page_size = page_size.to_string();
    let query = [
        ("pageToken", cursor.as_str()),
        ("spaces", "drive"),
        ("includeItemsFromAllDrives", "true"),
        ("supportsAllDrives", "true"),
        ("includeRemoved", "true"),
        ("pageSize", page_size.as_str()),
        ("fields", CHANGE_FIELDS),
    ];
    let bytes = client.get_bytes("/changes", &query, Endpoint::Changes).await?;
    let page = ChangeParser::parse(&bytes)?;

    debug!(
        cursor = %cursor,
        records = page.records.len(),
        has_next = page.next_cursor.is_some(),
        has_checkpoint = page.new_checkpoint.is_some(),
        "Fetched change page"
    );
    Ok(page)
}
