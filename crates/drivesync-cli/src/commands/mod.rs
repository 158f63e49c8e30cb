//! CLI subcommands

pub mod auth;
pub mod changes;
pub mod checkpoint;
pub mod config;
pub mod download;
pub mod sync;
