use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use spoor_core::config::RemoteConfig;
use spoor_core::db::Database;
use spoor_core::sync::SyncSummary;
use spoor_core::Report;

use crate::auth::SupabaseAuthService;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ReportListItem {
    pub id: String,
    pub user_id: String,
    pub observation_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_timestamp: i64,
    pub captured_at: String,
    pub relative_time: String,
    pub total_count: i64,
    pub loss_type: Vec<String>,
    pub notes: Option<String>,
    pub status: String,
    pub sync_status: String,
}

/// Remote settings, profile name, and auth client for commands that talk to Supabase.
pub struct RemoteContext {
    pub profile_name: String,
    pub config: RemoteConfig,
    pub auth: SupabaseAuthService,
}

/// Resolve remote settings from `SPOOR_*` env vars, falling back to the profile.
pub fn load_remote_context(profile: Option<&str>) -> Result<RemoteContext, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = profiles.resolve_profile_name(profile);

    let config = match RemoteConfig::from_env()? {
        Some(config) => config,
        None => profiles
            .profile(&profile_name)
            .map(CliProfile::remote_config)
            .transpose()
            .map_err(CliError::Config)?
            .flatten()
            .ok_or(CliError::RemoteNotConfigured)?,
    };

    let auth = SupabaseAuthService::new(&profile_name, &config)
        .map_err(|error| CliError::Auth(error.to_string()))?;
    Ok(RemoteContext {
        profile_name,
        config,
        auth,
    })
}

pub fn resolve_profile_name(profile: Option<&str>) -> Result<String, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    Ok(profiles.resolve_profile_name(profile))
}

pub fn format_report_lines(reports: &[Report]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    reports
        .iter()
        .map(|report| {
            let id = report.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let kind = report
                .observation_type
                .map_or("-", |kind| kind.as_str());
            let relative_time = format_relative_time(report.device_timestamp, now_ms);
            let preview = report
                .notes
                .as_deref()
                .map(|notes| notes_preview(notes, 40))
                .unwrap_or_default();

            format!(
                "{short_id:<13}  {:<7}  {kind:<8}  {relative_time:<10}  {preview}",
                report.sync_status.as_str()
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

pub fn report_to_list_item(report: &Report) -> ReportListItem {
    let now_ms = Utc::now().timestamp_millis();
    let total_count = if report.tallies.total == 0 {
        report.tallies.counted()
    } else {
        report.tallies.total
    };

    ReportListItem {
        id: report.id.to_string(),
        user_id: report.user_id.clone(),
        observation_type: report.observation_type.map(|kind| kind.to_string()),
        latitude: report.location.map(|point| point.latitude),
        longitude: report.location.map(|point| point.longitude),
        device_timestamp: report.device_timestamp,
        captured_at: format_timestamp(report.device_timestamp),
        relative_time: format_relative_time(report.device_timestamp, now_ms),
        total_count,
        loss_type: report.loss_type.clone(),
        notes: report.notes.clone(),
        status: report.status.clone(),
        sync_status: report.sync_status.to_string(),
    }
}

pub fn notes_preview(notes: &str, max_chars: usize) -> String {
    let first_line = notes.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_summary_lines(summary: &SyncSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Sync finished: {} attempted, {} synced, {} failed",
        summary.attempted, summary.synced, summary.failed
    )];
    if summary.cancelled {
        lines.push("Run was cancelled; remaining reports stay queued.".to_string());
    }
    lines.extend(
        summary
            .failures
            .iter()
            .map(|failure| format!("  {}  {}", failure.report_id, failure.reason)),
    );
    lines
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_report_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyReportId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| env::var_os("SPOOR_DB_PATH").map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("spoor").join("spoor.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn open_database(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path).await?)
}
