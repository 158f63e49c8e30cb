//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the reconciliation core depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICredentialProvider`] - Bearer credentials for the source account
//! - [`IChangeFeed`] - Cursor-paginated change feed
//! - [`IMetadataProvider`] - Metadata lookups by identifier
//! - [`IContentTransport`] - Binary download and native-document export
//! - [`IObjectSink`] - Idempotent key/value blob writes
//! - [`ICheckpointStore`] - Durable single-value cursor storage

pub mod change_feed;
pub mod checkpoint_store;
pub mod content_transport;
pub mod credential;
pub mod metadata;
pub mod object_sink;

pub use change_feed::{ChangePage, IChangeFeed};
pub use checkpoint_store::ICheckpointStore;
pub use content_transport::IContentTransport;
pub use credential::{Credential, ICredentialProvider};
pub use metadata::IMetadataProvider;
pub use object_sink::{
    IObjectSink, ObjectMetadata, META_FILE_ID, META_MODIFIED_TIME, META_SOURCE_MIME,
};
