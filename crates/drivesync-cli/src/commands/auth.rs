//! Auth commands - Manage the stored refresh token
//!
//! Provides the `drivesync auth` CLI subcommands which:
//! 1. `store` - Saves a refresh token in the system keyring, keyed by the
//!    configured OAuth client ID.
//! 2. `clear` - Removes the stored refresh token.
//! 3. `check` - Obtains an access token with the selected credentials.

use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Subcommand;
use drivesync_drive::auth::KeyringSecretStorage;
use tracing::info;

use crate::{
    context::AppContext,
    output::{get_formatter, OutputFormat, OutputFormatter},
};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store a refresh token in the system keyring
    Store {
        /// Refresh token; read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored refresh token
    Clear,
    /// Verify that an access token can be obtained
    Check,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        match self {
            AuthCommand::Store { token } => self.execute_store(ctx, token.as_deref(), &*fmt),
            AuthCommand::Clear => self.execute_clear(ctx, &*fmt),
            AuthCommand::Check => self.execute_check(ctx, &*fmt, format).await,
        }
    }

    fn execute_store(
        &self,
        ctx: &AppContext,
        token: Option<&str>,
        fmt: &dyn OutputFormatter,
    ) -> Result<()> {
        let client_id = keyring_account(ctx)?;

        let token = match token {
            Some(token) => token.trim().to_string(),
            None => {
                fmt.info("Paste the refresh token and press Enter:");
                let mut line = String::new();
                std::io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .context("Failed to read refresh token from stdin")?;
                line.trim().to_string()
            }
        };
        if token.is_empty() {
            anyhow::bail!("Refresh token is empty");
        }

        KeyringSecretStorage::store(client_id, &token)?;
        info!(client_id, "Refresh token stored");
        fmt.success(&format!("Refresh token stored for client {client_id}"));
        fmt.print_json(&serde_json::json!({"success": true, "client_id": client_id}));
        Ok(())
    }

    fn execute_clear(&self, ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
        let client_id = keyring_account(ctx)?;
        KeyringSecretStorage::clear(client_id)?;
        fmt.success(&format!("Refresh token removed for client {client_id}"));
        fmt.print_json(&serde_json::json!({"success": true, "client_id": client_id}));
        Ok(())
    }

    async fn execute_check(
        &self,
        ctx: &AppContext,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let provider = ctx.credentials()?;
        let credential = provider
            .get_credential()
            .await
            .context("Failed to obtain an access token")?;

        let expires_at = credential.expires_at.map(|t| t.to_rfc3339());
        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "authenticated": true,
                "expires_at": expires_at,
            }));
        } else {
            fmt.success("Access token obtained");
            fmt.field(
                "Expires",
                expires_at.as_deref().unwrap_or("unknown (static token)"),
            );
        }
        Ok(())
    }
}

/// Keyring entries are keyed by the OAuth client the token was issued to
fn keyring_account(ctx: &AppContext) -> Result<&str> {
    ctx.config
        .drive
        .client_id
        .as_deref()
        .context("drive.client_id must be configured to use the keyring")
}
