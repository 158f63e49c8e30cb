//! Shortcut (indirection) resolution
//!
//! Shortcuts carry no content of their own. Resolution replaces the
//! shortcut's metadata with its target's so that deduplication, naming and
//! content retrieval all operate on the real file. Only one level is
//! followed: a shortcut pointing at another shortcut resolves to that
//! shortcut, which the classifier then ignores.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    domain::{FileMeta, IgnoreReason},
    ports::IMetadataProvider,
};

/// Outcome of shortcut resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutResolution {
    /// The entry is not a shortcut; keep the original metadata
    NotShortcut,
    /// The target's current metadata
    Resolved(FileMeta),
    /// The change should be skipped without further lookups
    Skip(IgnoreReason),
}

/// Substitutes shortcut targets
pub struct ShortcutResolver {
    metadata: Arc<dyn IMetadataProvider>,
}

impl ShortcutResolver {
    pub fn new(metadata: Arc<dyn IMetadataProvider>) -> Self {
        Self { metadata }
    }

    /// Resolve `meta` if it is a shortcut
    ///
    /// # Errors
    ///
    /// Returns an error if the target lookup itself fails. A target that
    /// does not exist is a skip, not an error.
    pub async fn resolve(&self, meta: &FileMeta) -> Result<ShortcutResolution> {
        if !meta.is_shortcut() {
            return Ok(ShortcutResolution::NotShortcut);
        }

        let Some(target_id) = meta
            .shortcut_target_id
            .as_deref()
            .filter(|id| !id.is_empty())
        else {
            return Ok(ShortcutResolution::Skip(
                IgnoreReason::ShortcutTargetUnavailable { target_id: None },
            ));
        };

        let target = self
            .metadata
            .get_metadata(target_id)
            .await
            .with_context(|| format!("Failed to fetch shortcut target {target_id}"))?;

        match target {
            Some(target) if !target.trashed => {
                let mut target = target;
                if target.id.is_empty() {
                    target.id = target_id.to_string();
                }
                if target.modified_time.is_none() {
                    target.modified_time = meta.modified_time;
                }
                Ok(ShortcutResolution::Resolved(target))
            }
            _ => Ok(ShortcutResolution::Skip(
                IgnoreReason::ShortcutTargetUnavailable {
                    target_id: Some(target_id.to_string()),
                },
            )),
        }
    }
}
