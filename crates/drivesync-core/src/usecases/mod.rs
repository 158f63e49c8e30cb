//! Use cases (interactors) for DriveSync
//!
//! Use cases orchestrate domain logic through the port interfaces.
//!
//! ## Use Cases
//!
//! - [`ReconcileChangesUseCase`] - Mirror changed files and advance the checkpoint
//! - [`ListChangesUseCase`] - Inspect pending changes without uploading
//! - [`PathResolver`] - Folder ancestry to path segments
//! - [`ShortcutResolver`] - Shortcut target substitution

pub mod list_changes;
pub mod reconcile;
pub mod resolve_path;
pub mod resolve_shortcut;

pub use list_changes::{ChangeListing, ListChangesUseCase};
pub use reconcile::{ReconcileChangesUseCase, ReconcilePorts, ReconcileSettings};
pub use resolve_path::{FolderPath, PathResolver, DEFAULT_MAX_DEPTH};
pub use resolve_shortcut::{ShortcutResolution, ShortcutResolver};
