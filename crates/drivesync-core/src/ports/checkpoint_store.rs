//! Checkpoint store port
//!
//! A durable single-value store for the change-feed cursor. The store is
//! assumed to have a single writer; concurrent runs against the same
//! checkpoint are not supported.

use crate::domain::ChangeCursor;

/// Durable storage for the resume cursor
#[async_trait::async_trait]
pub trait ICheckpointStore: Send + Sync {
    /// Read the stored cursor; `Ok(None)` when uninitialized
    async fn get(&self) -> anyhow::Result<Option<ChangeCursor>>;

    /// Overwrite the stored cursor, creating it if absent
    ///
    /// Must be durable when it returns `Ok`.
    async fn put(&self, cursor: &ChangeCursor) -> anyhow::Result<()>;

    /// Forget the stored cursor so the next run bootstraps again
    async fn clear(&self) -> anyhow::Result<()>;
}
