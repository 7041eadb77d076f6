//! Remote upsert protocol.
//!
//! Each write targets a deterministic id and merges on conflict, so repeating
//! any call leaves the remote state unchanged.

mod rows;
mod supabase;

use std::time::Duration;

use thiserror::Error;

pub use rows::{
    damage_id, geo_point, media_object_path, observation_id, tables, DamageCategory, DamageRow,
    MediaRow, ObservationRow, RemoteObservationType, ReportRow, REMOTE_STATUS_FAILED,
};
pub use supabase::SupabaseRemote;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error for {target}: {message}")]
    Api { target: String, message: String },
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Remote call cancelled")]
    Cancelled,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Idempotent writes against the shared remote store.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn upsert_report(&self, row: &ReportRow) -> RemoteResult<()>;

    async fn upsert_observation(&self, row: &ObservationRow) -> RemoteResult<()>;

    async fn upsert_damage(&self, row: &DamageRow) -> RemoteResult<()>;

    /// Store a blob at `path`, overwriting any previous object there.
    async fn upload_media(&self, path: &str, bytes: Vec<u8>, mime_type: &str)
        -> RemoteResult<()>;

    async fn upsert_media_metadata(&self, row: &MediaRow) -> RemoteResult<()>;

    /// Mirror a local failure into the remote report's workflow status.
    async fn mark_report_failed(&self, report_id: &str) -> RemoteResult<()>;
}
