//! Metadata provider port

use crate::domain::FileMeta;

/// Lookup of file and folder metadata by identifier
///
/// Used for ancestry walks and shortcut target resolution.
#[async_trait::async_trait]
pub trait IMetadataProvider: Send + Sync {
    /// Fetch current metadata; `Ok(None)` when the entity does not exist
    async fn get_metadata(&self, id: &str) -> anyhow::Result<Option<FileMeta>>;
}
