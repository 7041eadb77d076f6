use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] spoor_core::Error),
    #[error(transparent)]
    Sync(#[from] spoor_core::sync::SyncError),
    #[error(transparent)]
    Remote(#[from] spoor_core::remote::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Report ID cannot be empty")]
    EmptyReportId,
    #[error("Report not found: {0}")]
    ReportNotFound(String),
    #[error("Unsupported photo type for {0}")]
    UnsupportedPhoto(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Remote is not configured. Run `spoor config init` or set SPOOR_SUPABASE_URL and SPOOR_SUPABASE_ANON_KEY."
    )]
    RemoteNotConfigured,
    #[error("Not signed in. Run `spoor auth login --email <email> --password <password>`.")]
    NotSignedIn,
}
