//! In-memory implementations of every port, shared by the use-case tests.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use chrono::{TimeZone, Utc};
use drivesync_core::{
    domain::{mime, ChangeCursor, ChangeRecord, FileMeta, StorageKey},
    ports::{
        ChangePage, Credential, IChangeFeed, ICheckpointStore, IContentTransport,
        ICredentialProvider, IMetadataProvider, IObjectSink, ObjectMetadata,
    },
    usecases::{ReconcileChangesUseCase, ReconcilePorts, ReconcileSettings},
};
use tokio_util::sync::CancellationToken;

pub fn cursor(value: &str) -> ChangeCursor {
    ChangeCursor::new(value.to_string()).unwrap()
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn binary(id: &str, name: &str, parent: Option<&str>) -> FileMeta {
    FileMeta {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        modified_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
        trashed: false,
        parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        shortcut_target_id: None,
    }
}

pub fn with_mime(mut meta: FileMeta, mime_type: &str) -> FileMeta {
    meta.mime_type = mime_type.to_string();
    meta
}

pub fn folder(id: &str, name: &str, parent: Option<&str>) -> FileMeta {
    with_mime(binary(id, name, parent), mime::FOLDER)
}

pub fn shortcut(id: &str, target: &str) -> FileMeta {
    FileMeta {
        shortcut_target_id: Some(target.to_string()),
        ..with_mime(binary(id, "link", None), mime::SHORTCUT)
    }
}

pub fn change(meta: FileMeta) -> ChangeRecord {
    ChangeRecord {
        entity_id: Some(meta.id.clone()),
        removed: false,
        file: Some(meta),
    }
}

pub fn removal(id: &str) -> ChangeRecord {
    ChangeRecord {
        entity_id: Some(id.to_string()),
        removed: true,
        file: None,
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCredentials {
    pub fail: AtomicBool,
}

#[async_trait::async_trait]
impl ICredentialProvider for FakeCredentials {
    async fn get_credential(&self) -> anyhow::Result<Credential> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("refresh token revoked");
        }
        Ok(Credential::bearer("test-token"))
    }
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

pub struct FakePage {
    pub records: Vec<ChangeRecord>,
    pub next: Option<&'static str>,
    pub checkpoint: Option<&'static str>,
}

#[derive(Default)]
pub struct FakeFeed {
    pub position: Mutex<String>,
    pub pages: Mutex<HashMap<String, FakePage>>,
    pub failing: Mutex<HashSet<String>>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeFeed {
    pub fn add_page(&self, at: &str, records: Vec<ChangeRecord>, next: Option<&'static str>, checkpoint: Option<&'static str>) {
        self.pages.lock().unwrap().insert(
            at.to_string(),
            FakePage {
                records,
                next,
                checkpoint,
            },
        );
    }

    pub fn fail_at(&self, at: &str) {
        self.failing.lock().unwrap().insert(at.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IChangeFeed for FakeFeed {
    async fn current_position(&self) -> anyhow::Result<ChangeCursor> {
        Ok(cursor(&self.position.lock().unwrap()))
    }

    async fn list_page(&self, at: &ChangeCursor) -> anyhow::Result<ChangePage> {
        self.requested.lock().unwrap().push(at.to_string());
        if self.failing.lock().unwrap().contains(at.as_str()) {
            anyhow::bail!("HTTP 503 from change feed");
        }
        let pages = self.pages.lock().unwrap();
        let page = pages
            .get(at.as_str())
            .ok_or_else(|| anyhow::anyhow!("no page at {at}"))?;
        Ok(ChangePage {
            records: page.records.clone(),
            next_cursor: page.next.map(cursor),
            new_checkpoint: page.checkpoint.map(cursor),
        })
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMetadata {
    pub items: Mutex<HashMap<String, FileMeta>>,
    pub failing: Mutex<HashSet<String>>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeMetadata {
    pub fn add(&self, meta: FileMeta) {
        self.items.lock().unwrap().insert(meta.id.clone(), meta);
    }

    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IMetadataProvider for FakeMetadata {
    async fn get_metadata(&self, id: &str) -> anyhow::Result<Option<FileMeta>> {
        self.lookups.lock().unwrap().push(id.to_string());
        if self.failing.lock().unwrap().contains(id) {
            anyhow::bail!("metadata lookup failed for {id}");
        }
        Ok(self.items.lock().unwrap().get(id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeContent {
    pub failing: Mutex<HashSet<String>>,
    pub downloads: Mutex<Vec<String>>,
    pub exports: Mutex<Vec<(String, String)>>,
    /// Cancelled when the given id is fetched
    pub cancel_on: Mutex<Option<(String, CancellationToken)>>,
}

impl FakeContent {
    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn cancel_when_fetching(&self, id: &str, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((id.to_string(), token));
    }

    fn before_fetch(&self, id: &str) -> anyhow::Result<()> {
        if let Some((target, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if target == id {
                token.cancel();
            }
        }
        if self.failing.lock().unwrap().contains(id) {
            anyhow::bail!("download of {id} failed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IContentTransport for FakeContent {
    async fn download(&self, id: &str) -> anyhow::Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(id.to_string());
        self.before_fetch(id)?;
        Ok(format!("bytes of {id}").into_bytes())
    }

    async fn export(&self, id: &str, target_mime: &str) -> anyhow::Result<Vec<u8>> {
        self.exports
            .lock()
            .unwrap()
            .push((id.to_string(), target_mime.to_string()));
        self.before_fetch(id)?;
        Ok(format!("export of {id}").into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

#[derive(Default)]
pub struct FakeSink {
    pub objects: Mutex<BTreeMap<String, StoredObject>>,
    pub puts: Mutex<Vec<String>>,
    pub failing_keys_containing: Mutex<Option<String>>,
}

impl FakeSink {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn fail_keys_containing(&self, fragment: &str) {
        *self.failing_keys_containing.lock().unwrap() = Some(fragment.to_string());
    }
}

#[async_trait::async_trait]
impl IObjectSink for FakeSink {
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> anyhow::Result<()> {
        if let Some(fragment) = self.failing_keys_containing.lock().unwrap().as_deref() {
            if key.as_str().contains(fragment) {
                anyhow::bail!("sink rejected {key}");
            }
        }
        self.puts.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCheckpoints {
    pub value: Mutex<Option<ChangeCursor>>,
    pub writes: Mutex<Vec<String>>,
    pub fail_puts: AtomicBool,
}

impl MemoryCheckpoints {
    pub fn seeded(value: &str) -> Self {
        let store = Self::default();
        *store.value.lock().unwrap() = ChangeCursor::from_stored(Some(value));
        store
    }

    pub fn current(&self) -> Option<String> {
        self.value.lock().unwrap().as_ref().map(|c| c.to_string())
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ICheckpointStore for MemoryCheckpoints {
    async fn get(&self) -> anyhow::Result<Option<ChangeCursor>> {
        Ok(self.value.lock().unwrap().clone())
    }

    async fn put(&self, cursor: &ChangeCursor) -> anyhow::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.writes.lock().unwrap().push(cursor.to_string());
        *self.value.lock().unwrap() = Some(cursor.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Harness {
    pub credentials: Arc<FakeCredentials>,
    pub feed: Arc<FakeFeed>,
    pub metadata: Arc<FakeMetadata>,
    pub content: Arc<FakeContent>,
    pub sink: Arc<FakeSink>,
    pub checkpoints: Arc<MemoryCheckpoints>,
}

impl Harness {
    pub fn with_checkpoint(value: &str) -> Self {
        Self {
            checkpoints: Arc::new(MemoryCheckpoints::seeded(value)),
            ..Self::default()
        }
    }

    pub fn ports(&self) -> ReconcilePorts {
        ReconcilePorts {
            credentials: self.credentials.clone(),
            feed: self.feed.clone(),
            metadata: self.metadata.clone(),
            content: self.content.clone(),
            sink: self.sink.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }

    pub fn use_case(&self) -> ReconcileChangesUseCase {
        ReconcileChangesUseCase::new(self.ports(), ReconcileSettings::default())
    }
}
