//! DriveProvider - port implementations backed by the Drive v3 API
//!
//! One [`DriveProvider`] serves as the change feed, the metadata provider
//! and the content transport of a reconciliation run. All three share the
//! same [`DriveClient`], and with it the credential provider and rate limiter.

use std::sync::Arc;

use anyhow::{Context, Result};
use drivesync_core::{
    domain::{ChangeCursor, FileMeta},
    ports::{ChangePage, IChangeFeed, IContentTransport, IMetadataProvider},
};
use tracing::debug;

use crate::{
    changes::{self, DEFAULT_PAGE_SIZE},
    client::DriveClient,
    files,
};

/// Drive-backed change feed, metadata provider and content transport
pub struct DriveProvider {
    client: Arc<DriveClient>,
    page_size: u32,
}

impl DriveProvider {
    pub fn new(client: Arc<DriveClient>) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Number of changes requested per page (clamped to 1..=1000)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IChangeFeed for DriveProvider {
    async fn current_position(&self) -> Result<ChangeCursor> {
        changes::get_start_page_token(&self.client)
            .await
            .context("Failed to fetch start page token")
    }

    async fn list_page(&self, cursor: &ChangeCursor) -> Result<ChangePage> {
        changes::list_changes(&self.client, cursor, self.page_size)
            .await
            .with_context(|| format!("Failed to list changes from cursor {cursor}"))
    }
}

#[async_trait::async_trait]
impl IMetadataProvider for DriveProvider {
    async fn get_metadata(&self, id: &str) -> Result<Option<FileMeta>> {
        debug!(id, "DriveProvider::get_metadata");
        files::get_metadata(&self.client, id)
            .await
            .with_context(|| format!("Failed to fetch metadata for {id}"))
    }
}

#[async_trait::async_trait]
impl IContentTransport for DriveProvider {
    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        files::download(&self.client, id)
            .await
            .with_context(|| format!("Failed to download {id}"))
    }

    async fn export(&self, id: &str, target_mime: &str) -> Result<Vec<u8>> {
        files::export(&self.client, id, target_mime)
            .await
            .with_context(|| format!("Failed to export {id} as {target_mime}"))
    }
}
