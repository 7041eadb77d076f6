//! Offline-first synchronization of queued reports.
//!
//! A run takes every `pending` or `failed` report from the local store and
//! pushes it through the remote upsert protocol one record at a time. Failures
//! are isolated per record; only a missing signed-in user fails the whole run.

mod engine;
mod guard;
mod validation;

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthError;
use crate::config::{RemoteConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::{MediaId, ReportId};
use crate::remote::RemoteError;

pub use engine::SyncEngine;
pub use guard::RunGuard;
pub use validation::{is_allowed_mime_type, is_safe_identifier, ALLOWED_MIME_TYPES};

/// Errors that abort a whole run before any record is touched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No signed-in user; sign in before syncing")]
    NotAuthenticated,
    #[error("Failed to resolve the signed-in user: {0}")]
    Auth(#[from] AuthError),
    #[error("Failed to read the local queue: {0}")]
    Store(#[from] crate::Error),
}

/// Why a single record ended up `failed`.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("report is owned by {owner}, not the signed-in user")]
    OwnerMismatch { owner: String },
    #[error("identifier '{0}' contains characters outside [A-Za-z0-9_-]")]
    UnsafeIdentifier(String),
    #[error("media {media_id} has disallowed MIME type '{mime_type}'")]
    DisallowedMimeType { media_id: MediaId, mime_type: String },
    #[error("media {media_id} payload could not be decoded: {reason}")]
    UndecodablePayload { media_id: MediaId, reason: String },
    #[error("{step} write failed: {source}")]
    Remote {
        step: &'static str,
        #[source]
        source: RemoteError,
    },
    #[error("local store error: {0}")]
    Store(#[from] crate::Error),
    #[error("unexpected panic: {0}")]
    Panicked(String),
}

/// Per-run knobs for remote calls.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound on each remote call.
    pub call_timeout: Duration,
    /// Cancelling stops the in-flight call and ends the run after that record.
    pub cancel: CancellationToken,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cancel: CancellationToken::new(),
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            call_timeout: config.request_timeout(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub report_id: ReportId,
    pub reason: String,
}

/// Result of one completed (or skipped) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Records picked up by the run
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// The run stopped early on cancellation
    pub cancelled: bool,
    pub failures: Vec<RecordFailure>,
}

impl SyncSummary {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }
}

/// The `{success, count, error}` shape handed back to triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub success: bool,
    pub count: usize,
    pub error: Option<String>,
}

impl From<Result<SyncSummary, SyncError>> for SyncReport {
    fn from(result: Result<SyncSummary, SyncError>) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                count: summary.attempted,
                error: None,
            },
            Err(error) => Self {
                success: false,
                count: 0,
                error: Some(error.to_string()),
            },
        }
    }
}
