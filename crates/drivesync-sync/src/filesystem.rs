//! Local directory sink (secondary/driven adapter)
//!
//! Implements [`IObjectSink`] by mirroring each storage key as a relative
//! path under a root directory.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: Content is written to a sibling temp file and renamed
//!   over the target, so readers never observe a partial object.
//! - **Sidecars**: The content type and metadata envelope of `<leaf>` are
//!   stored next to it as `<leaf>.metadata.json`.
//! - **Containment**: Keys with empty, `.` or `..` components, or with
//!   components that a filesystem would read as a path, are rejected before
//!   anything touches the disk.

use std::path::{Component, Path, PathBuf};

use drivesync_core::{
    domain::StorageKey,
    ports::{IObjectSink, ObjectMetadata},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::SinkError;

/// Suffix appended to an object's path to name its sidecar
pub const SIDECAR_SUFFIX: &str = ".metadata.json";

/// Contents of a `<leaf>.metadata.json` sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSidecar {
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

/// Sink writing objects as files below a root directory
#[derive(Debug, Clone)]
pub struct LocalDirectorySink {
    root: PathBuf,
}

impl LocalDirectorySink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path at which `key` is stored
    ///
    /// # Errors
    /// Returns [`SinkError::InvalidKey`] if a component would escape the root.
    pub fn object_path(&self, key: &StorageKey) -> Result<PathBuf, SinkError> {
        let invalid = |reason: &str| SinkError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let mut path = self.root.clone();
        for part in key.components() {
            if part.contains('\\') || part.contains('\0') {
                return Err(invalid("component contains a path separator or NUL"));
            }
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(part),
                _ => return Err(invalid("component is empty, relative or absolute")),
            }
        }
        Ok(path)
    }

    /// Path of the sidecar describing the object at `object_path`
    pub fn sidecar_path(object_path: &Path) -> PathBuf {
        let mut p = object_path.as_os_str().to_owned();
        p.push(SIDECAR_SUFFIX);
        PathBuf::from(p)
    }

    /// Read back the sidecar stored for `key`, `None` if there is none
    pub async fn read_sidecar(&self, key: &StorageKey) -> anyhow::Result<Option<ObjectSidecar>> {
        let path = Self::sidecar_path(&self.object_path(key)?);
        match tokio::fs::read(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SinkError::Io { path, source }.into()),
        }
    }
}

/// Write `data` to `target` via a sibling temp file and a rename
async fn write_atomic(target: &Path, data: &[u8]) -> Result<(), SinkError> {
    let io = |path: &Path, source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io(parent, e))?;
    }

    // Temp file in the same directory so the rename stays on one filesystem
    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };
    debug!(?tmp_path, "writing to temporary file");
    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| io(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, target)
        .await
        .map_err(|e| io(target, e))?;
    Ok(())
}

#[async_trait::async_trait]
impl IObjectSink for LocalDirectorySink {
    #[instrument(skip(self, body, metadata), fields(key = %key, bytes = body.len()))]
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> anyhow::Result<()> {
        let target = self.object_path(key)?;

        let sidecar = ObjectSidecar {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        };
        let sidecar_json = serde_json::to_vec_pretty(&sidecar)?;

        write_atomic(&target, &body).await?;
        write_atomic(&Self::sidecar_path(&target), &sidecar_json).await?;

        debug!(path = %target.display(), "object written");
        Ok(())
    }
}
