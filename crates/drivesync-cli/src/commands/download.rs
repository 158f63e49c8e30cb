//! Download command - Fetch a single file by identifier
//!
//! Binary files are downloaded as they are; native documents are exported
//! using the same format table as the sync. Shortcuts are followed once.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use drivesync_core::{
    domain::{export_format_for, FileMeta},
    ports::{IContentTransport, IMetadataProvider},
};
use tracing::info;

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat},
};

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Drive file identifier
    #[arg(long)]
    pub file_id: String,

    /// Destination path
    #[arg(long)]
    pub out: PathBuf,
}

/// A file's metadata and bytes
struct Fetched {
    meta: FileMeta,
    bytes: Vec<u8>,
    content_type: String,
}

impl DownloadCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let provider = ctx.drive_provider(ctx.credentials()?);

        let fetched = fetch(&*provider, &*provider, &self.file_id).await?;
        write_output(&self.out, &fetched.bytes).await?;

        info!(
            file_id = %self.file_id,
            out = %self.out.display(),
            bytes = fetched.bytes.len(),
            "Download complete"
        );

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "file_id": fetched.meta.id,
                "name": fetched.meta.name,
                "content_type": fetched.content_type,
                "bytes": fetched.bytes.len(),
                "out": self.out.display().to_string(),
            }));
        } else {
            fmt.success(&format!("Saved {}", self.out.display()));
            fmt.field("Name", fetched.meta.display_name());
            fmt.field("Type", &fetched.content_type);
            fmt.field("Size", &format!("{} bytes", fetched.bytes.len()));
        }
        Ok(())
    }
}

async fn fetch(
    metadata: &dyn IMetadataProvider,
    content: &dyn IContentTransport,
    file_id: &str,
) -> Result<Fetched> {
    let mut meta = metadata
        .get_metadata(file_id)
        .await?
        .with_context(|| format!("File {file_id} not found"))?;

    if meta.is_shortcut() {
        let target = meta
            .shortcut_target_id
            .clone()
            .with_context(|| format!("Shortcut {file_id} has no target"))?;
        meta = metadata
            .get_metadata(&target)
            .await?
            .with_context(|| format!("Shortcut target {target} not found"))?;
    }

    info!(name = %meta.name, mime_type = %meta.mime_type, "Fetching file");

    if meta.is_folder() {
        anyhow::bail!("{} is a folder", meta.id);
    }

    if meta.is_native() {
        let export = export_format_for(&meta.mime_type).with_context(|| {
            format!("{} has type {} which cannot be exported", meta.id, meta.mime_type)
        })?;
        let bytes = content.export(&meta.id, export.target_mime).await?;
        return Ok(Fetched {
            meta,
            bytes,
            content_type: export.target_mime.to_string(),
        });
    }

    let bytes = content.download(&meta.id).await?;
    let content_type = meta.mime_type.clone();
    Ok(Fetched {
        meta,
        bytes,
        content_type,
    })
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
