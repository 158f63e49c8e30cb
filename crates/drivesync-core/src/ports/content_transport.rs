//! Content transport port
//!
//! Both operations deliver the complete byte sequence or fail. Chunking,
//! streaming and retries are the adapter's concern.

/// Byte fetcher keyed by file identifier and format
#[async_trait::async_trait]
pub trait IContentTransport: Send + Sync {
    /// Download the raw bytes of a binary file
    async fn download(&self, id: &str) -> anyhow::Result<Vec<u8>>;

    /// Export a native document to `target_mime`
    async fn export(&self, id: &str, target_mime: &str) -> anyhow::Result<Vec<u8>>;
}
