//! Domain error types
//!
//! [`DomainError`] covers validation failures of domain values.
//! [`SyncError`] is the fatal failure taxonomy of a reconciliation run:
//! anything that reaches it aborted the run. Per-record failures never
//! become a `SyncError`; they are recorded in the run report instead.

use thiserror::Error;

/// Errors that can occur while constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid entity identifier
    #[error("Invalid entity ID: {0}")]
    InvalidEntityId(String),

    /// Invalid change-feed cursor
    #[error("Invalid change cursor: {0}")]
    InvalidCursor(String),

    /// Invalid storage key
    #[error("Invalid storage key: {0}")]
    InvalidStorageKey(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failures that abort a reconciliation run
///
/// Every variant leaves the stored checkpoint at the last page boundary
/// that was fully processed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The credential provider could not produce a bearer credential
    #[error("Authentication failed: {source:#}")]
    AuthFailure {
        #[source]
        source: anyhow::Error,
    },

    /// The current feed position could not be fetched during bootstrap
    #[error("Failed to fetch the current change-feed position: {source:#}")]
    FeedPosition {
        #[source]
        source: anyhow::Error,
    },

    /// A change-feed page could not be fetched
    #[error("Failed to fetch change page at cursor {cursor}: {source:#}")]
    FeedPage {
        /// Cursor of the page that failed
        cursor: String,
        #[source]
        source: anyhow::Error,
    },

    /// The checkpoint store could not be read
    #[error("Failed to read checkpoint: {source:#}")]
    CheckpointRead {
        #[source]
        source: anyhow::Error,
    },

    /// A new checkpoint could not be made durable
    #[error("Failed to persist checkpoint {cursor}: {source:#}")]
    CheckpointPersist {
        /// Cursor that failed to persist
        cursor: String,
        #[source]
        source: anyhow::Error,
    },

    /// The run was cancelled between records
    #[error(
        "Run cancelled; checkpoint remains at {}",
        .last_checkpoint.as_deref().unwrap_or("<uninitialized>")
    )]
    Cancelled {
        /// Last durably stored checkpoint
        last_checkpoint: Option<String>,
    },
}

impl SyncError {
    /// Stable machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::AuthFailure { .. } => "auth_failure",
            SyncError::FeedPosition { .. } => "feed_position_failure",
            SyncError::FeedPage { .. } => "feed_page_failure",
            SyncError::CheckpointRead { .. } => "checkpoint_read_failure",
            SyncError::CheckpointPersist { .. } => "checkpoint_persist_failure",
            SyncError::Cancelled { .. } => "cancelled",
        }
    }

    /// Page cursor associated with the failure, if any
    pub fn cursor(&self) -> Option<&str> {
        match self {
            SyncError::FeedPage { cursor, .. } | SyncError::CheckpointPersist { cursor, .. } => {
                Some(cursor)
            }
            SyncError::Cancelled { last_checkpoint } => last_checkpoint.as_deref(),
            _ => None,
        }
    }
}
