//! JSON file implementation of ICheckpointStore
//!
//! The checkpoint is a single document:
//!
//! ```json
//! {"startPageToken": "12345"}
//! ```
//!
//! Writes go to a sibling temp file that is flushed and renamed over the
//! target, so a crash leaves either the old or the new document.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use drivesync_core::{domain::ChangeCursor, ports::ICheckpointStore};

use crate::StateError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointDocument {
    start_page_token: Option<String>,
}

/// Checkpoint store backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut p = self.path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    }

    async fn read_document(&self) -> Result<Option<CheckpointDocument>, StateError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            StateError::SerializationError(format!(
                "Invalid checkpoint document {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn write_document(&self, document: &CheckpointDocument) -> Result<(), StateError> {
        let json = serde_json::to_vec(document)
            .map_err(|e| StateError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(&json).await.map_err(|e| self.io_error(e))?;
        file.sync_all().await.map_err(|e| self.io_error(e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ICheckpointStore for JsonFileCheckpointStore {
    async fn get(&self) -> anyhow::Result<Option<ChangeCursor>> {
        let document = self.read_document().await?;
        Ok(ChangeCursor::from_stored(
            document
                .as_ref()
                .and_then(|d| d.start_page_token.as_deref()),
        ))
    }

    async fn put(&self, cursor: &ChangeCursor) -> anyhow::Result<()> {
        self.write_document(&CheckpointDocument {
            start_page_token: Some(cursor.to_string()),
        })
        .await?;
        debug!(path = %self.path.display(), cursor = %cursor, "Checkpoint stored");
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Checkpoint file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e).into()),
        }
    }
}
