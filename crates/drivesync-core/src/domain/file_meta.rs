//! File metadata snapshots and change-feed records
//!
//! [`FileMeta`] and [`ChangeRecord`] are port-level DTOs shared by the
//! change feed, the metadata provider and the use cases. They are never
//! mutated; shortcut resolution replaces a `FileMeta` wholesale.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Well-known MIME types of the source account
pub mod mime {
    /// Folder entries; never carry content
    pub const FOLDER: &str = "application/vnd.google-apps.folder";
    /// Shortcut entries pointing at another file
    pub const SHORTCUT: &str = "application/vnd.google-apps.shortcut";
    /// Prefix shared by every provider-native type
    pub const NATIVE_PREFIX: &str = "application/vnd.google-apps.";
    /// Native word-processing document
    pub const DOCUMENT: &str = "application/vnd.google-apps.document";
    /// Native spreadsheet
    pub const SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
    /// Native presentation
    pub const PRESENTATION: &str = "application/vnd.google-apps.presentation";
    /// Native drawing (no export mapping)
    pub const DRAWING: &str = "application/vnd.google-apps.drawing";
    /// Fallback content type for binary blobs
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Snapshot of one file, folder or shortcut
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Identifier (empty when the provider omitted it)
    pub id: String,
    /// Display name
    pub name: String,
    /// MIME type as reported by the provider
    pub mime_type: String,
    /// Last modification time
    pub modified_time: Option<DateTime<Utc>>,
    /// Whether the entry is in the trash
    pub trashed: bool,
    /// Parent identifiers; the first one is the primary parent
    pub parents: Vec<String>,
    /// Target identifier when this entry is a shortcut
    pub shortcut_target_id: Option<String>,
}

impl FileMeta {
    /// Returns true if the entry is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == mime::FOLDER
    }

    /// Returns true if the entry is a shortcut
    pub fn is_shortcut(&self) -> bool {
        self.mime_type == mime::SHORTCUT
    }

    /// Returns true if the MIME type is provider-native
    pub fn is_native(&self) -> bool {
        self.mime_type.starts_with(mime::NATIVE_PREFIX)
    }

    /// First listed parent, if any
    pub fn primary_parent(&self) -> Option<&str> {
        self.parents
            .first()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Name to use for paths, falling back to the identifier
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Modification time as RFC 3339 in UTC (`Z` suffix), or empty when unknown
    pub fn modified_time_rfc3339(&self) -> String {
        self.modified_time
            .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            .unwrap_or_default()
    }
}

/// One entry of a change-feed page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Identifier of the changed entity
    pub entity_id: Option<String>,
    /// Whether the entity was removed from the account
    pub removed: bool,
    /// Current metadata, absent for removals
    pub file: Option<FileMeta>,
}

impl ChangeRecord {
    /// Identifier of the record, preferring the embedded file metadata
    pub fn id(&self) -> Option<&str> {
        self.file
            .as_ref()
            .map(|f| f.id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.entity_id.as_deref().filter(|id| !id.is_empty()))
    }
}
