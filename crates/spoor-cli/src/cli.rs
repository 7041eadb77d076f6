use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use spoor_core::models::ObservationType;
use spoor_core::SyncStatus;

#[derive(Parser)]
#[command(name = "spoor")]
#[command(about = "Record wildlife field reports offline and sync them when back online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for remote and auth configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a new field report
    #[command(alias = "new")]
    Add(AddArgs),
    /// List queued reports
    List {
        /// Number of reports to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only show reports in this sync state
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a report's notes and queue it for sync again
    Edit {
        /// Report ID
        id: String,
        /// New notes (empty clears them)
        #[arg(long)]
        notes: String,
    },
    /// Show how many reports are pending, synced, or failed
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload pending and failed reports
    Sync {
        /// Keep running and sync whenever the remote becomes reachable
        #[arg(long)]
        watch: bool,
        /// Seconds between connectivity probes in watch mode
        #[arg(long, default_value = "30", value_name = "SECS")]
        interval: u64,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct AddArgs {
    /// Observation kind
    #[arg(long = "type", value_enum)]
    pub observation_type: Option<ObservationKind>,
    /// Latitude in decimal degrees
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    pub longitude: Option<f64>,
    #[arg(long)]
    pub division: Option<String>,
    #[arg(long)]
    pub range: Option<String>,
    #[arg(long)]
    pub beat: Option<String>,
    #[arg(long, default_value = "0")]
    pub male: i64,
    #[arg(long, default_value = "0")]
    pub female: i64,
    #[arg(long, default_value = "0")]
    pub calf: i64,
    #[arg(long, default_value = "0")]
    pub unknown: i64,
    /// Total count (defaults to the sum of the individual counts)
    #[arg(long)]
    pub total: Option<i64>,
    /// Compass bearing in degrees (0-360)
    #[arg(long)]
    pub bearing: Option<i64>,
    /// Indirect sign label (repeatable)
    #[arg(long = "sign", value_name = "LABEL")]
    pub signs: Vec<String>,
    /// Loss category label (repeatable)
    #[arg(long = "loss", value_name = "LABEL")]
    pub losses: Vec<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Photo to attach (repeatable)
    #[arg(long = "photo", value_name = "PATH")]
    pub photos: Vec<PathBuf>,
    /// Owner user ID (defaults to the signed-in user)
    #[arg(long, value_name = "ID")]
    pub user_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ObservationKind {
    Direct,
    Indirect,
    Loss,
}

impl From<ObservationKind> for ObservationType {
    fn from(value: ObservationKind) -> Self {
        match value {
            ObservationKind::Direct => Self::Direct,
            ObservationKind::Indirect => Self::Indirect,
            ObservationKind::Loss => Self::Loss,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Pending,
    Synced,
    Failed,
}

impl From<StatusFilter> for SyncStatus {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Synced => Self::Synced,
            StatusFilter::Failed => Self::Failed,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Storage bucket for report photos
        #[arg(long, value_name = "BUCKET")]
        media_bucket: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Logout profile and clear stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
