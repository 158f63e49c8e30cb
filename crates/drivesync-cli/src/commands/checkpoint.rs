//! Checkpoint commands - Inspect and manage the stored resume cursor
//!
//! 1. `show`  - Prints the stored cursor (and its timestamp for SQLite).
//! 2. `reset` - Deletes the stored cursor; the next sync bootstraps again.
//! 3. `set`   - Overwrites the cursor, e.g. to replay from a known position.

use anyhow::{Context, Result};
use clap::Subcommand;
use drivesync_core::{domain::ChangeCursor, ports::ICheckpointStore};
use tracing::info;

use crate::{
    context::{AppContext, CheckpointBackend},
    output::{get_formatter, OutputFormat},
};

#[derive(Debug, Subcommand)]
pub enum CheckpointCommand {
    /// Show the stored checkpoint
    Show,
    /// Forget the stored checkpoint
    Reset,
    /// Store a specific checkpoint
    Set {
        /// Change-feed cursor (a start page token)
        cursor: String,
    },
}

impl CheckpointCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let backend = ctx.checkpoint_backend().await?;
        match self {
            CheckpointCommand::Show => show(ctx, &backend, format).await,
            CheckpointCommand::Reset => reset(ctx, &backend, format).await,
            CheckpointCommand::Set { cursor } => set(ctx, &backend, cursor, format).await,
        }
    }
}

async fn show(ctx: &AppContext, backend: &CheckpointBackend, format: OutputFormat) -> Result<()> {
    let fmt = get_formatter(format);
    let location = backend.location(&ctx.config);

    let (cursor, updated_at) = match backend {
        CheckpointBackend::Sqlite(store) => {
            let entry = store.entry().await?;
            (
                entry.as_ref().and_then(|e| e.cursor()),
                entry.and_then(|e| e.updated_at),
            )
        }
        CheckpointBackend::File(store) => (store.get().await?, None),
    };

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({
            "location": location,
            "checkpoint": cursor.as_ref().map(ChangeCursor::as_str),
            "updated_at": updated_at.map(|t| t.to_rfc3339()),
        }));
        return Ok(());
    }

    match &cursor {
        Some(cursor) => {
            fmt.success("Checkpoint stored");
            fmt.field("Checkpoint", cursor.as_str());
            if let Some(at) = updated_at {
                fmt.field("Updated", &at.to_rfc3339());
            }
        }
        None => fmt.warn("No checkpoint stored; the next sync will initialize one"),
    }
    fmt.field("Location", &location);
    Ok(())
}

async fn reset(ctx: &AppContext, backend: &CheckpointBackend, format: OutputFormat) -> Result<()> {
    let fmt = get_formatter(format);
    backend.store().clear().await?;
    info!(location = %backend.location(&ctx.config), "Checkpoint reset");

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({"success": true, "checkpoint": null}));
    } else {
        fmt.success("Checkpoint cleared; the next sync starts from the current position");
    }
    Ok(())
}

async fn set(
    ctx: &AppContext,
    backend: &CheckpointBackend,
    raw: &str,
    format: OutputFormat,
) -> Result<()> {
    let fmt = get_formatter(format);
    let cursor = ChangeCursor::new(raw.trim().to_string()).context("Invalid checkpoint")?;
    backend.store().put(&cursor).await?;
    info!(cursor = %cursor, location = %backend.location(&ctx.config), "Checkpoint set");

    if format == OutputFormat::Json {
        fmt.print_json(&serde_json::json!({"success": true, "checkpoint": cursor.as_str()}));
    } else {
        fmt.success(&format!("Checkpoint set to {cursor}"));
    }
    Ok(())
}
