//! Change-feed reconciliation use case
//!
//! Consumes the change feed from the stored checkpoint, mirrors every
//! changed file into the object sink and advances the checkpoint after each
//! fully processed page.
//!
//! ## Checkpoint semantics
//!
//! - No stored checkpoint: the feed's current position is stored and the run
//!   ends without processing anything (no backfill).
//! - A page's `new_checkpoint` is persisted only after every record of that
//!   page went through the loop. A crash mid-page re-processes that page on
//!   the next run; uploads are idempotent per key so this is safe.
//! - A page fetch failure or a checkpoint write failure aborts the run and
//!   leaves the stored checkpoint at the last page boundary.
//! - Per-record failures are recorded in the report and never abort the run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{
        build_key, classify, export_name, prescreen, sanitize_leaf, ChangeRecord, Disposition,
        ExportFormat, FailureStage, IgnoreReason, RunId, RunOutcome, RunReport, RunState,
        SkipReason, SyncError, UploadedObject,
    },
    ports::{
        IChangeFeed, ICheckpointStore, IContentTransport, ICredentialProvider,
        IMetadataProvider, IObjectSink, ObjectMetadata,
    },
    usecases::{
        resolve_path::{PathResolver, DEFAULT_MAX_DEPTH},
        resolve_shortcut::{ShortcutResolution, ShortcutResolver},
    },
};

/// Tunables of a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// First key component(s) of every object
    pub key_prefix: String,
    /// Label standing in for the account root in keys
    pub root_label: String,
    /// Bound on folder ancestry walks
    pub max_path_depth: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            key_prefix: "drivesync".to_string(),
            root_label: "My Drive".to_string(),
            max_path_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Collaborators of the reconciliation loop
#[derive(Clone)]
pub struct ReconcilePorts {
    pub credentials: Arc<dyn ICredentialProvider>,
    pub feed: Arc<dyn IChangeFeed>,
    pub metadata: Arc<dyn IMetadataProvider>,
    pub content: Arc<dyn IContentTransport>,
    pub sink: Arc<dyn IObjectSink>,
    pub checkpoints: Arc<dyn ICheckpointStore>,
}

/// How content is obtained for a record that will be uploaded
enum Transfer {
    Export(ExportFormat),
    Download(String),
}

/// Use case mirroring changed files into the object sink
pub struct ReconcileChangesUseCase {
    ports: ReconcilePorts,
    settings: ReconcileSettings,
    paths: PathResolver,
    shortcuts: ShortcutResolver,
}

impl ReconcileChangesUseCase {
    /// Creates a new ReconcileChangesUseCase
    pub fn new(ports: ReconcilePorts, settings: ReconcileSettings) -> Self {
        let paths = PathResolver::new(
            ports.metadata.clone(),
            settings.root_label.clone(),
            settings.max_path_depth,
        );
        let shortcuts = ShortcutResolver::new(ports.metadata.clone());
        Self {
            ports,
            settings,
            paths,
            shortcuts,
        }
    }

    /// Run once with fresh run-scoped state and no cancellation
    pub async fn execute(&self) -> Result<RunOutcome, SyncError> {
        let mut state = RunState::new();
        self.execute_with(&mut state, &CancellationToken::new())
            .await
    }

    /// Run once with caller-provided state and cancellation
    ///
    /// Cancellation is observed between records; the checkpoint is left at
    /// the last page boundary and [`SyncError::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] for every failure that aborts the run.
    #[tracing::instrument(skip_all, fields(run_id = %RunId::new()))]
    pub async fn execute_with(
        &self,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, SyncError> {
        self.ports
            .credentials
            .get_credential()
            .await
            .map_err(|source| {
                error!(error = %format!("{source:#}"), "Credential unavailable");
                SyncError::AuthFailure { source }
            })?;

        let stored = self
            .ports
            .checkpoints
            .get()
            .await
            .map_err(|source| SyncError::CheckpointRead { source })?;

        let Some(start) = stored else {
            return self.bootstrap().await;
        };

        info!(cursor = %start, "Resuming change feed");
        let mut report = RunReport {
            final_checkpoint: Some(start.to_string()),
            ..RunReport::default()
        };
        let mut page_cursor = start;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(&report));
            }

            let page = self
                .ports
                .feed
                .list_page(&page_cursor)
                .await
                .map_err(|source| {
                    error!(cursor = %page_cursor, error = %format!("{source:#}"), "Change page fetch failed");
                    SyncError::FeedPage {
                        cursor: page_cursor.to_string(),
                        source,
                    }
                })?;

            debug!(
                cursor = %page_cursor,
                records = page.records.len(),
                has_next = page.next_cursor.is_some(),
                "Fetched change page"
            );

            for record in &page.records {
                if cancel.is_cancelled() {
                    return Err(self.cancelled(&report));
                }
                let entity_id = record.id().map(str::to_string);
                match self.process_record(record, state).await {
                    Ok(upload) => {
                        info!(
                            entity_id = %upload.entity_id,
                            key = %upload.key,
                            size = upload.size,
                            "Uploaded"
                        );
                        report.record_upload(upload);
                    }
                    Err(reason) => {
                        log_skip(entity_id.as_deref(), &reason);
                        report.record_skip(entity_id, reason);
                    }
                }
            }

            if let Some(checkpoint) = &page.new_checkpoint {
                self.ports
                    .checkpoints
                    .put(checkpoint)
                    .await
                    .map_err(|source| {
                        error!(cursor = %checkpoint, error = %format!("{source:#}"), "Checkpoint persist failed");
                        SyncError::CheckpointPersist {
                            cursor: checkpoint.to_string(),
                            source,
                        }
                    })?;
                debug!(cursor = %checkpoint, "Checkpoint persisted");
                report.final_checkpoint = Some(checkpoint.to_string());
            }
            report.pages += 1;

            match page.next_cursor {
                Some(next) => page_cursor = next,
                None => {
                    if page.new_checkpoint.is_none() {
                        warn!(
                            cursor = %page_cursor,
                            "Final page carried no new checkpoint; the next run resumes from the previous one"
                        );
                    }
                    break;
                }
            }
        }

        info!(
            uploaded = report.uploaded,
            skipped = report.skipped,
            pages = report.pages,
            folders_cached = state.folders.len(),
            "Reconciliation complete"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Store the feed's current position as the first checkpoint
    async fn bootstrap(&self) -> Result<RunOutcome, SyncError> {
        let position = self
            .ports
            .feed
            .current_position()
            .await
            .map_err(|source| SyncError::FeedPosition { source })?;

        self.ports
            .checkpoints
            .put(&position)
            .await
            .map_err(|source| SyncError::CheckpointPersist {
                cursor: position.to_string(),
                source,
            })?;

        info!(cursor = %position, "No checkpoint found; initialized from current feed position");
        Ok(RunOutcome::Initialized {
            checkpoint: position.to_string(),
        })
    }

    fn cancelled(&self, report: &RunReport) -> SyncError {
        warn!(
            uploaded = report.uploaded,
            skipped = report.skipped,
            "Run cancelled between records"
        );
        SyncError::Cancelled {
            last_checkpoint: report.final_checkpoint.clone(),
        }
    }

    /// Apply resolution, deduplication, classification and transfer to one record
    async fn process_record(
        &self,
        record: &ChangeRecord,
        state: &mut RunState,
    ) -> Result<UploadedObject, SkipReason> {
        let original = prescreen(record).map_err(|reason| SkipReason::Ignored { reason })?;

        let resolved = match self.shortcuts.resolve(original).await {
            Ok(ShortcutResolution::NotShortcut) => original.clone(),
            Ok(ShortcutResolution::Resolved(target)) => {
                debug!(shortcut = %original.id, target = %target.id, "Resolved shortcut");
                target
            }
            Ok(ShortcutResolution::Skip(reason)) => {
                return Err(SkipReason::Ignored { reason });
            }
            Err(e) => return Err(failed(FailureStage::ShortcutTarget, &e)),
        };

        if !state.seen.insert_if_new(&resolved.id) {
            return Err(SkipReason::Duplicate);
        }

        let transfer = match classify(&resolved) {
            Disposition::Ignore(reason) => return Err(SkipReason::Ignored { reason }),
            Disposition::ExportDocument(format) => Transfer::Export(format),
            Disposition::DownloadBinary { content_type } => Transfer::Download(content_type),
        };

        let path = self
            .paths
            .resolve(resolved.primary_parent(), &mut state.folders)
            .await
            .map_err(|e| failed(FailureStage::FolderPath, &e))?;

        // The extension check runs on the sanitized name.
        let leaf = sanitize_leaf(resolved.display_name());
        let (leaf, content_type, exported_from) = match &transfer {
            Transfer::Export(format) => (
                export_name(&leaf, format),
                format.target_mime.to_string(),
                Some(resolved.mime_type.as_str()),
            ),
            Transfer::Download(content_type) => (leaf, content_type.clone(), None),
        };
        let key = build_key(
            &self.settings.key_prefix,
            &path.segments,
            &leaf,
            Some(&resolved.id),
        );

        let body = match &transfer {
            Transfer::Export(format) => {
                self.ports
                    .content
                    .export(&resolved.id, format.target_mime)
                    .await
            }
            Transfer::Download(_) => self.ports.content.download(&resolved.id).await,
        }
        .map_err(|e| failed(FailureStage::Content, &e))?;

        let size = body.len() as u64;
        let metadata = ObjectMetadata::for_source(&resolved, exported_from);
        self.ports
            .sink
            .put_object(&key, body, &content_type, &metadata)
            .await
            .map_err(|e| failed(FailureStage::Sink, &e))?;

        Ok(UploadedObject {
            entity_id: resolved.id.clone(),
            key,
            content_type,
            size,
            exported: exported_from.is_some(),
        })
    }
}

fn failed(stage: FailureStage, error: &anyhow::Error) -> SkipReason {
    SkipReason::Failed {
        stage,
        message: format!("{error:#}"),
    }
}

fn log_skip(entity_id: Option<&str>, reason: &SkipReason) {
    let entity_id = entity_id.unwrap_or("<none>");
    match reason {
        SkipReason::Ignored {
            reason: IgnoreReason::UnsupportedNative { mime_type },
        } => info!(entity_id, mime_type = %mime_type, "Skipping native type without export"),
        SkipReason::Ignored { reason } => debug!(entity_id, reason = %reason, "Skipping change"),
        SkipReason::Duplicate => debug!(entity_id, "Skipping change already processed in this run"),
        SkipReason::Failed { stage, message } => {
            warn!(entity_id, stage = %stage, error = %message, "Record failed; continuing")
        }
    }
}
