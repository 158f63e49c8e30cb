//! DriveSync Core - change reconciliation logic
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileMeta`, `ChangeRecord`, `Disposition`, `ChangeCursor`, `StorageKey`
//! - **Pure functions** - storage key building and change classification
//! - **Use cases** - `ReconcileChangesUseCase`, `ListChangesUseCase`, path and shortcut resolution
//! - **Port definitions** - Traits for adapters: `IChangeFeed`, `IMetadataProvider`,
//!   `IContentTransport`, `IObjectSink`, `ICheckpointStore`, `ICredentialProvider`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure logic with no I/O. Ports define the trait
//! interfaces that adapter crates implement, and use cases drive them.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
