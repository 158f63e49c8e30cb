//! Change listing use case
//!
//! Pages through the change feed without touching content or the sink,
//! for inspection. The checkpoint is only advanced when asked to.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    domain::{ChangeRecord, SyncError},
    ports::{IChangeFeed, ICheckpointStore},
};

/// Result of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChangeListing {
    /// No checkpoint existed; the current feed position was stored
    Initialized { checkpoint: String },
    /// Records since the stored checkpoint
    Listed {
        records: Vec<ChangeRecord>,
        pages: u64,
        /// Resume position reported by the feed
        new_checkpoint: Option<String>,
        /// Whether `new_checkpoint` was stored
        advanced: bool,
    },
}

/// Use case listing pending changes
pub struct ListChangesUseCase {
    feed: Arc<dyn IChangeFeed>,
    checkpoints: Arc<dyn ICheckpointStore>,
}

impl ListChangesUseCase {
    pub fn new(feed: Arc<dyn IChangeFeed>, checkpoints: Arc<dyn ICheckpointStore>) -> Self {
        Self { feed, checkpoints }
    }

    /// List every change since the stored checkpoint
    ///
    /// With `advance`, each page's new checkpoint is stored as it arrives,
    /// exactly like a reconciliation run would.
    pub async fn execute(&self, advance: bool) -> Result<ChangeListing, SyncError> {
        let stored = self
            .checkpoints
            .get()
            .await
            .map_err(|source| SyncError::CheckpointRead { source })?;

        let Some(mut cursor) = stored else {
            let position = self
                .feed
                .current_position()
                .await
                .map_err(|source| SyncError::FeedPosition { source })?;
            self.checkpoints
                .put(&position)
                .await
                .map_err(|source| SyncError::CheckpointPersist {
                    cursor: position.to_string(),
                    source,
                })?;
            info!(cursor = %position, "Initialized checkpoint");
            return Ok(ChangeListing::Initialized {
                checkpoint: position.to_string(),
            });
        };

        let mut records = Vec::new();
        let mut pages = 0;
        let mut new_checkpoint = None;

        loop {
            let page = self
                .feed
                .list_page(&cursor)
                .await
                .map_err(|source| SyncError::FeedPage {
                    cursor: cursor.to_string(),
                    source,
                })?;
            pages += 1;
            debug!(cursor = %cursor, records = page.records.len(), "Listed change page");
            records.extend(page.records);

            if let Some(checkpoint) = page.new_checkpoint {
                if advance {
                    self.checkpoints.put(&checkpoint).await.map_err(|source| {
                        SyncError::CheckpointPersist {
                            cursor: checkpoint.to_string(),
                            source,
                        }
                    })?;
                }
                new_checkpoint = Some(checkpoint.to_string());
            }

            match page.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(ChangeListing::Listed {
            records,
            pages,
            new_checkpoint,
            advanced: advance,
        })
    }
}
