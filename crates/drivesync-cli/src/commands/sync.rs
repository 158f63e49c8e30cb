//! Sync command - Mirror Drive changes into the object sink
//!
//! Provides the `drivesync sync` CLI command which:
//! 1. Selects credentials and builds the Drive provider
//! 2. Opens the checkpoint store and the configured sink
//! 3. Runs the SyncEngine (Ctrl-C cancels between records)
//! 4. Displays the run outcome

use anyhow::Result;
use clap::Args;
use drivesync_core::{
    domain::{RunOutcome, RunReport},
    usecases::ReconcilePorts,
};
use drivesync_sync::{build_sink, SyncEngine, SyncResult};
use tracing::{info, warn};

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat, OutputFormatter},
};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// List every uploaded object and skipped record
    #[arg(long)]
    pub details: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);

        let credentials = ctx.credentials()?;
        let provider = ctx.drive_provider(credentials.clone());
        let checkpoints = ctx.checkpoint_backend().await?.store();
        let sink = build_sink(&ctx.config.storage)?;

        let ports = ReconcilePorts {
            credentials,
            feed: provider.clone(),
            metadata: provider.clone(),
            content: provider,
            sink,
            checkpoints,
        };
        let engine = SyncEngine::new(ports, &ctx.config);

        let cancel = engine.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; stopping after the current record");
                cancel.cancel();
            }
        });

        info!(backend = %ctx.config.storage.backend, "Starting synchronization");
        fmt.info("Starting synchronization...");

        let result = engine.sync().await?;

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "outcome": result.outcome,
                "duration_ms": result.duration_ms,
            }));
        } else {
            self.print_human(&*fmt, &result);
        }
        Ok(())
    }

    fn print_human(&self, fmt: &dyn OutputFormatter, result: &SyncResult) {
        match &result.outcome {
            RunOutcome::Initialized { checkpoint } => {
                fmt.success("Checkpoint initialized; the next run mirrors changes from here");
                fmt.field("Checkpoint", checkpoint);
            }
            RunOutcome::Completed(report) => {
                fmt.success("Synchronization complete");
                print_report(fmt, report);
                if self.details {
                    print_details(fmt, report);
                }
            }
        }
        fmt.field("Duration", &format!("{} ms", result.duration_ms));
    }
}

fn print_report(fmt: &dyn OutputFormatter, report: &RunReport) {
    fmt.field("Uploaded", &report.uploaded.to_string());
    fmt.field("Skipped", &report.skipped.to_string());
    fmt.field("Failed", &report.failed().to_string());
    fmt.field("Pages", &report.pages.to_string());
    fmt.field(
        "Checkpoint",
        report.final_checkpoint.as_deref().unwrap_or("-"),
    );
    if report.failed() > 0 {
        fmt.warn(&format!(
            "{} record(s) failed and will not be retried by the next run",
            report.failed()
        ));
    }
}

fn print_details(fmt: &dyn OutputFormatter, report: &RunReport) {
    if !report.uploads.is_empty() {
        fmt.info("");
        fmt.info("Uploaded:");
        for upload in &report.uploads {
            fmt.info(&format!(
                "  {} ({} bytes{})",
                upload.key,
                upload.size,
                if upload.exported { ", exported" } else { "" }
            ));
        }
    }
    if !report.skips.is_empty() {
        fmt.info("");
        fmt.info("Skipped:");
        for skip in &report.skips {
            fmt.info(&format!(
                "  {}: {}",
                skip.entity_id.as_deref().unwrap_or("<no id>"),
                skip.reason
            ));
        }
    }
}
