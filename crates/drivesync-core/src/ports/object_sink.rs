//! Object sink port
//!
//! The sink is an idempotent key/value blob store: writing an existing key
//! overwrites it and never fails as "already exists".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FileMeta, StorageKey};

/// Metadata key holding the source file identifier
pub const META_FILE_ID: &str = "drive_file_id";
/// Metadata key holding the source modification time (RFC 3339)
pub const META_MODIFIED_TIME: &str = "drive_modified_time";
/// Metadata key holding the native type of an exported document
pub const META_SOURCE_MIME: &str = "drive_source_mime";

/// String metadata stored alongside an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectMetadata(BTreeMap<String, String>);

impl ObjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope describing the source of an object
    ///
    /// `exported_from` is the native MIME type for exported documents.
    pub fn for_source(meta: &FileMeta, exported_from: Option<&str>) -> Self {
        let mut envelope = Self::new();
        envelope.insert(META_FILE_ID, &meta.id);
        envelope.insert(META_MODIFIED_TIME, meta.modified_time_rfc3339());
        if let Some(native) = exported_from {
            envelope.insert(META_SOURCE_MIME, native);
        }
        envelope
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Destination for mirrored content
#[async_trait::async_trait]
pub trait IObjectSink: Send + Sync {
    /// Write `body` under `key`, replacing any existing object
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> anyhow::Result<()>;
}
