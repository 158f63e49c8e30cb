//! Change classification
//!
//! Every change is assigned exactly one [`Disposition`]. The decision is made
//! once per record, after shortcut resolution, and the rest of the loop only
//! dispatches on the variant.

use serde::Serialize;

use super::file_meta::{mime, ChangeRecord, FileMeta};

/// Target format for exporting a native document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportFormat {
    /// MIME type requested from the export endpoint
    pub target_mime: &'static str,
    /// File extension, including the leading dot
    pub extension: &'static str,
}

/// Native types with a defined export mapping.
///
/// Drawings are intentionally absent and are ignored.
const EXPORT_TABLE: &[(&str, ExportFormat)] = &[
    (
        mime::DOCUMENT,
        ExportFormat {
            target_mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            extension: ".docx",
        },
    ),
    (
        mime::SPREADSHEET,
        ExportFormat {
            target_mime: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            extension: ".xlsx",
        },
    ),
    (
        mime::PRESENTATION,
        ExportFormat {
            target_mime: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            extension: ".pptx",
        },
    ),
];

/// Look up the export format for a native MIME type
pub fn export_format_for(mime_type: &str) -> Option<ExportFormat> {
    EXPORT_TABLE
        .iter()
        .find(|(native, _)| *native == mime_type)
        .map(|(_, format)| *format)
}

/// Why a change produced no upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The entity was removed from the account
    Removed,
    /// The entity is in the trash
    Trashed,
    /// The record carried no usable identifier
    MissingId,
    /// Folders have no content
    Folder,
    /// Native type without an export mapping
    UnsupportedNative { mime_type: String },
    /// Shortcut target is missing, trashed or unnamed
    ShortcutTargetUnavailable { target_id: Option<String> },
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::Removed => write!(f, "removed"),
            IgnoreReason::Trashed => write!(f, "trashed"),
            IgnoreReason::MissingId => write!(f, "missing id"),
            IgnoreReason::Folder => write!(f, "folder"),
            IgnoreReason::UnsupportedNative { mime_type } => {
                write!(f, "native type without export: {mime_type}")
            }
            IgnoreReason::ShortcutTargetUnavailable { target_id } => write!(
                f,
                "shortcut target unavailable: {}",
                target_id.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

/// What to do with one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Disposition {
    /// Nothing to upload
    Ignore(IgnoreReason),
    /// Export a native document to a standard format
    ExportDocument(ExportFormat),
    /// Download the raw bytes
    DownloadBinary { content_type: String },
}

impl Disposition {
    /// Content type to store alongside the object, if anything is stored
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Disposition::Ignore(_) => None,
            Disposition::ExportDocument(format) => Some(format.target_mime),
            Disposition::DownloadBinary { content_type } => Some(content_type),
        }
    }
}

/// Reject records that can be ignored before any lookup
///
/// Runs ahead of shortcut resolution so that removals and trashed entries
/// never trigger a metadata fetch.
pub fn prescreen(record: &ChangeRecord) -> Result<&FileMeta, IgnoreReason> {
    if record.removed {
        return Err(IgnoreReason::Removed);
    }
    let file = record.file.as_ref().ok_or(IgnoreReason::MissingId)?;
    if file.id.is_empty() {
        return Err(IgnoreReason::MissingId);
    }
    if file.trashed {
        return Err(IgnoreReason::Trashed);
    }
    Ok(file)
}

/// Classify resolved metadata
///
/// Total over every `FileMeta`: unknown types fall through to
/// [`Disposition::DownloadBinary`].
pub fn classify(meta: &FileMeta) -> Disposition {
    if meta.id.is_empty() {
        return Disposition::Ignore(IgnoreReason::MissingId);
    }
    if meta.trashed {
        return Disposition::Ignore(IgnoreReason::Trashed);
    }
    if meta.is_folder() {
        return Disposition::Ignore(IgnoreReason::Folder);
    }
    if let Some(format) = export_format_for(&meta.mime_type) {
        return Disposition::ExportDocument(format);
    }
    if meta.is_native() {
        return Disposition::Ignore(IgnoreReason::UnsupportedNative {
            mime_type: meta.mime_type.clone(),
        });
    }
    let content_type = if meta.mime_type.trim().is_empty() {
        mime::OCTET_STREAM.to_string()
    } else {
        meta.mime_type.clone()
    };
    Disposition::DownloadBinary { content_type }
}

/// Classify a raw change record without shortcut resolution
pub fn classify_change(record: &ChangeRecord) -> Disposition {
    match prescreen(record) {
        Ok(meta) => classify(meta),
        Err(reason) => Disposition::Ignore(reason),
    }
}

/// Output filename for an exported document
///
/// The extension is appended unless the name already ends with it,
/// compared case-insensitively. `name` should already be sanitized with
/// [`sanitize_leaf`](super::key::sanitize_leaf).
pub fn export_name(name: &str, format: &ExportFormat) -> String {
    if name
        .to_lowercase()
        .ends_with(&format.extension.to_lowercase())
    {
        name.to_string()
    } else {
        format!("{name}{}", format.extension)
    }
}
