//! spoor-core - Core library for Spoor
//!
//! This crate holds the on-device report queue, the remote upsert protocol,
//! and the sync engine that reconciles the two. The `spoor` CLI is a thin
//! trigger surface over it.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Report, ReportId, ReportMedia, SyncStatus};
