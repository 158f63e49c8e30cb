//! Change feed port
//!
//! A change feed yields mutation records in pages. Each page may point at a
//! following page (`next_cursor`) and, typically on the last page, at the
//! position from which the next run should resume (`new_checkpoint`).

use crate::domain::{ChangeCursor, ChangeRecord};

/// One page of change records
#[derive(Debug, Clone, Default)]
pub struct ChangePage {
    /// Records in feed order
    pub records: Vec<ChangeRecord>,
    /// Cursor of the following page within this run
    pub next_cursor: Option<ChangeCursor>,
    /// Resume position for future runs
    pub new_checkpoint: Option<ChangeCursor>,
}

/// Cursor-paginated stream of change records
#[async_trait::async_trait]
pub trait IChangeFeed: Send + Sync {
    /// The feed's current position; changes before it are not replayed
    async fn current_position(&self) -> anyhow::Result<ChangeCursor>;

    /// Fetch the page starting at `cursor`
    async fn list_page(&self, cursor: &ChangeCursor) -> anyhow::Result<ChangePage>;
}
