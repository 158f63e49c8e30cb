//! Changes command - Inspect pending changes without mirroring them
//!
//! `drivesync changes` pages through the change feed from the stored
//! checkpoint and prints every record. With `--advance` the checkpoint is
//! moved past the listed changes, which means they will never be mirrored.

use anyhow::Result;
use clap::Args;
use drivesync_core::{
    domain::ChangeRecord,
    usecases::{ChangeListing, ListChangesUseCase},
};
use tracing::info;

use crate::{
    context::AppContext,
    output::{emit_json, get_formatter, OutputFormat},
};

#[derive(Debug, Args)]
pub struct ChangesCommand {
    /// Store the feed's new checkpoint after listing
    #[arg(long)]
    pub advance: bool,
}

impl ChangesCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);

        let provider = ctx.drive_provider(ctx.credentials()?);
        let checkpoints = ctx.checkpoint_backend().await?.store();

        info!(advance = self.advance, "Listing changes");
        let listing = ListChangesUseCase::new(provider, checkpoints)
            .execute(self.advance)
            .await?;

        if format == OutputFormat::Json {
            return emit_json(&*fmt, &listing);
        }

        match &listing {
            ChangeListing::Initialized { checkpoint } => {
                fmt.success("No checkpoint was stored; initialized from the current position");
                fmt.field("Checkpoint", checkpoint);
            }
            ChangeListing::Listed {
                records,
                pages,
                new_checkpoint,
                advanced,
            } => {
                fmt.success(&format!(
                    "{} change(s) across {} page(s)",
                    records.len(),
                    pages
                ));
                for record in records {
                    fmt.info(&describe(record));
                }
                fmt.field("New checkpoint", new_checkpoint.as_deref().unwrap_or("-"));
                fmt.field("Advanced", if *advanced { "yes" } else { "no" });
            }
        }
        Ok(())
    }
}

/// One line per change: id, state, type, name and modification time
fn describe(record: &ChangeRecord) -> String {
    let id = record.id().unwrap_or("<no id>");
    match &record.file {
        _ if record.removed => format!("{id}  removed"),
        None => format!("{id}  (no file metadata)"),
        Some(file) => format!(
            "{id}  {}{}  {}  {}",
            file.mime_type,
            if file.trashed { " [trashed]" } else { "" },
            file.display_name(),
            file.modified_time_rfc3339(),
        ),
    }
}
