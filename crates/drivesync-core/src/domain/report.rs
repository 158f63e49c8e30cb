//! Run outcomes
//!
//! A reconciliation run either bootstraps the checkpoint
//! ([`RunOutcome::Initialized`]) or pages through changes and reports what
//! happened to every record ([`RunOutcome::Completed`]).

use serde::Serialize;

use super::{classify::IgnoreReason, newtypes::StorageKey};

/// Step at which a single record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Fetching the target of a shortcut
    ShortcutTarget,
    /// Walking the folder ancestry
    FolderPath,
    /// Downloading or exporting content
    Content,
    /// Writing to the sink
    Sink,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureStage::ShortcutTarget => "shortcut_target",
            FailureStage::FolderPath => "folder_path",
            FailureStage::Content => "content",
            FailureStage::Sink => "sink",
        };
        write!(f, "{s}")
    }
}

/// Why a record was counted as skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The classifier or resolver ruled the record out
    Ignored { reason: IgnoreReason },
    /// The target was already processed earlier in this run
    Duplicate,
    /// A per-record operation failed
    Failed { stage: FailureStage, message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Ignored { reason } => write!(f, "ignored ({reason})"),
            SkipReason::Duplicate => write!(f, "duplicate"),
            SkipReason::Failed { stage, message } => write!(f, "failed at {stage}: {message}"),
        }
    }
}

/// A record that produced no upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Identifier as it appeared in the feed (before shortcut resolution)
    pub entity_id: Option<String>,
    pub reason: SkipReason,
}

/// An object written to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    /// Identifier of the content's source (the shortcut target, if any)
    pub entity_id: String,
    pub key: StorageKey,
    pub content_type: String,
    pub size: u64,
    pub exported: bool,
}

/// Counts and details of a run that paged through the feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub uploaded: u64,
    pub skipped: u64,
    /// Number of feed pages fully processed
    pub pages: u64,
    /// Last checkpoint made durable during the run
    pub final_checkpoint: Option<String>,
    pub uploads: Vec<UploadedObject>,
    pub skips: Vec<SkippedRecord>,
}

impl RunReport {
    pub(crate) fn record_upload(&mut self, upload: UploadedObject) {
        self.uploaded += 1;
        self.uploads.push(upload);
    }

    pub(crate) fn record_skip(&mut self, entity_id: Option<String>, reason: SkipReason) {
        self.skipped += 1;
        self.skips.push(SkippedRecord { entity_id, reason });
    }

    /// Number of records skipped because of a failure
    pub fn failed(&self) -> usize {
        self.skips
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Failed { .. }))
            .count()
    }
}

/// Result of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No checkpoint existed; the current feed position was stored
    Initialized { checkpoint: String },
    /// Changes were processed
    Completed(RunReport),
}

impl RunOutcome {
    /// Number of uploads (zero when initializing)
    pub fn uploaded(&self) -> u64 {
        match self {
            RunOutcome::Initialized { .. } => 0,
            RunOutcome::Completed(report) => report.uploaded,
        }
    }

    /// Number of skipped records (zero when initializing)
    pub fn skipped(&self) -> u64 {
        match self {
            RunOutcome::Initialized { .. } => 0,
            RunOutcome::Completed(report) => report.skipped,
        }
    }

    /// Checkpoint stored at the end of the run
    pub fn checkpoint(&self) -> Option<&str> {
        match self {
            RunOutcome::Initialized { checkpoint } => Some(checkpoint),
            RunOutcome::Completed(report) => report.final_checkpoint.as_deref(),
        }
    }
}
