use std::collections::BTreeMap;
use std::path::Path;

use spoor_core::db::{LibSqlReportRepository, ReportRepository};
use spoor_core::SyncStatus;

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let counts = LibSqlReportRepository::new(db.connection())
        .count_by_sync_status()
        .await?;

    if as_json {
        let by_name = status_counts(&counts)
            .into_iter()
            .map(|(status, count)| (status.as_str(), count))
            .collect::<BTreeMap<_, _>>();
        println!("{}", serde_json::to_string_pretty(&by_name)?);
    } else {
        for line in format_status_lines(&counts) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Counts for every state, including the ones with no reports.
pub fn status_counts(counts: &BTreeMap<SyncStatus, usize>) -> Vec<(SyncStatus, usize)> {
    [SyncStatus::Pending, SyncStatus::Failed, SyncStatus::Synced]
        .into_iter()
        .map(|status| (status, counts.get(&status).copied().unwrap_or(0)))
        .collect()
}

pub fn format_status_lines(counts: &BTreeMap<SyncStatus, usize>) -> Vec<String> {
    status_counts(counts)
        .into_iter()
        .map(|(status, count)| format!("{:<8} {count}", status.as_str()))
        .collect()
}
