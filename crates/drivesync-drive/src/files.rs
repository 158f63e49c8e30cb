//! File metadata, download and export requests
//!
//! - `GET /files/{id}` - metadata with the shared file projection; 404 is
//!   reported as absent
//! - `GET /files/{id}?alt=media` - raw content of binary files
//! - `GET /files/{id}/export?mimeType=...` - conversion of native documents

use chrono::{DateTime, Utc};
use drivesync_core::domain::FileMeta;
use serde::Deserialize;
use tracing::debug;

use crate::{client::DriveClient, rate_limit::Endpoint, DriveError};

/// Field projection requested for every file resource
pub const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,trashed,parents,shortcutDetails";

// ============================================================================
// Drive API response types
// ============================================================================

/// File resource as returned by `files.get` and inside `changes.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveFile {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    trashed: bool,
    #[serde(default)]
    parents: Vec<String>,
    shortcut_details: Option<ShortcutDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortcutDetails {
    target_id: Option<String>,
}

impl DriveFile {
    /// Convert to the domain representation
    ///
    /// `fallback_id` is used when the resource itself carries no `id`.
    pub(crate) fn into_file_meta(self, fallback_id: Option<&str>) -> FileMeta {
        FileMeta {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .or_else(|| fallback_id.map(str::to_string))
                .unwrap_or_default(),
            name: self.name,
            mime_type: self.mime_type,
            modified_time: self.modified_time,
            trashed: self.trashed,
            parents: self.parents,
            shortcut_target_id: self.shortcut_details.and_then(|d| d.target_id),
        }
    }
}

fn file_path(id: &str) -> String {
    format!("/files/{}", urlencode(id))
}

fn urlencode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

// ============================================================================
// Requests
// ============================================================================

/// Fetch a file's metadata; `Ok(None)` if it does not exist
pub async fn get_metadata(client: &DriveClient, id: &str) -> Result<Option<FileMeta>, DriveError> {
    let query = [("fields", FILE_FIELDS), ("supportsAllDrives", "true")];
    match client
        .get_json::<DriveFile>(&file_path(id), &query, Endpoint::Metadata)
        .await
    {
        Ok(file) => Ok(Some(file.into_file_meta(Some(id)))),
        Err(DriveError::NotFound(_)) => {
            debug!(id, "File not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Download the content of a binary file
pub async fn download(client: &DriveClient, id: &str) -> Result<Vec<u8>, DriveError> {
    let query = [("alt", "media"), ("supportsAllDrives", "true")];
    let bytes = client
        .get_bytes(&file_path(id), &query, Endpoint::Content)
        .await?;
    debug!(id, size = bytes.len(), "Downloaded file content");
    Ok(bytes)
}

/// Export a native document to `target_mime`
pub async fn export(
    client: &DriveClient,
    id: &str,
    target_mime: &str,
) -> Result<Vec<u8>, DriveError> {
    let path = format!("{}/export", file_path(id));
    let bytes = client
        .get_bytes(&path, &[("mimeType", target_mime)], Endpoint::Content)
        .await?;
    debug!(id, target_mime, size = bytes.len(), "Exported document");
    Ok(bytes)
}
