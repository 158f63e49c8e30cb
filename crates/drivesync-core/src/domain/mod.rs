//! Domain types and pure logic
//!
//! This module contains the core domain types for DriveSync:
//! - Newtypes for identifiers, feed cursors and storage keys
//! - File metadata snapshots and change records
//! - The change classifier and its closed set of dispositions
//! - The storage key builder
//! - Run-scoped state (folder cache, seen set)
//! - Run outcomes and the error taxonomy

pub mod classify;
pub mod errors;
pub mod file_meta;
pub mod key;
pub mod newtypes;
pub mod report;
pub mod run_state;

// Re-export commonly used types
pub use classify::{
    classify, classify_change, export_format_for, export_name, prescreen, Disposition,
    ExportFormat, IgnoreReason,
};
pub use errors::{DomainError, SyncError};
pub use file_meta::{mime, ChangeRecord, FileMeta};
pub use key::{build_key, sanitize_leaf, sanitize_segment};
pub use newtypes::*;
pub use report::{FailureStage, RunOutcome, RunReport, SkipReason, SkippedRecord, UploadedObject};
pub use run_state::{FolderCache, RunState, SeenSet};
