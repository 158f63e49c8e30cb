//! DriveSync State - Checkpoint persistence
//!
//! Durable storage for the change-feed resume cursor:
//! - [`SqliteCheckpointStore`] - named rows in a SQLite database
//! - [`JsonFileCheckpointStore`] - a small JSON document on disk
//!
//! ## Architecture
//!
//! Both stores implement the `ICheckpointStore` port from `drivesync-core`.
//! They are driven (secondary) adapters in the hexagonal architecture.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use drivesync_state::{DatabasePool, SqliteCheckpointStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/drivesync/state.db")).await?;
//! let store = SqliteCheckpointStore::new(pool.pool().clone(), "default");
//! // Use store as ICheckpointStore...
//! # Ok(())
//! # }
//! ```

pub mod file_store;
pub mod pool;
pub mod sqlite_store;

pub use file_store::JsonFileCheckpointStore;
pub use pool::DatabasePool;
pub use sqlite_store::{CheckpointEntry, SqliteCheckpointStore};

/// Errors that can occur during checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Reading or writing a state file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
