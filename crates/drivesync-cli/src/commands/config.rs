//! Config command - View and validate DriveSync configuration
//!
//! Provides the `drivesync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Prints the configuration file path

use anyhow::{Context, Result};
use clap::Subcommand;
use drivesync_core::config::{Config, ValidationError};
use tracing::info;

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat},
};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx, format),
            ConfigCommand::Validate => execute_validate(ctx, format),
            ConfigCommand::Path => {
                let fmt = get_formatter(format);
                if format == OutputFormat::Json {
                    fmt.print_json(&serde_json::json!({
                        "config_path": ctx.config_path.display().to_string(),
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(())
            }
        }
    }
}

fn execute_show(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let fmt = get_formatter(format);
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    let config = redacted(&ctx.config);
    if format == OutputFormat::Json {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        fmt.print_json(&json);
    } else {
        fmt.success(&format!("Configuration ({})", ctx.config_path.display()));
        fmt.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            fmt.info(line);
        }
    }
    Ok(())
}

fn execute_validate(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let fmt = get_formatter(format);
    let path = &ctx.config_path;

    if !path.exists() {
        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "valid": true,
                "config_path": path.display().to_string(),
                "errors": [],
                "defaults": true,
            }));
        } else {
            fmt.info(&format!("Configuration file not found at {}", path.display()));
            fmt.info("Built-in defaults are in use.");
        }
        return Ok(());
    }

    info!(config_path = %path.display(), "Validating configuration");
    let errors = ctx.config.validate();

    if format == OutputFormat::Json {
        let error_strings: Vec<String> = errors.iter().map(ValidationError::to_string).collect();
        fmt.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        fmt.success("Configuration is valid");
        fmt.info(&format!("File: {}", path.display()));
    } else {
        fmt.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        fmt.info(&format!("File: {}", path.display()));
        fmt.info("");
        for error in &errors {
            fmt.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("invalid configuration")
    }
}

/// Copy of `config` safe to print
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.drive.client_secret.is_some() {
        config.drive.client_secret = Some("<redacted>".to_string());
    }
    config
}
