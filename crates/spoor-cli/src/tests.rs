use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use spoor_core::db::{Database, LibSqlReportRepository, ReportRepository};
use spoor_core::models::ObservationType;
use spoor_core::sync::{RecordFailure, SyncSummary};
use spoor_core::{Report, ReportId, SyncStatus};

use crate::cli::StatusFilter;
use crate::commands::common::{
    format_relative_time, format_report_lines, format_summary_lines, format_timestamp,
    normalize_report_identifier, notes_preview, report_to_list_item,
};
use crate::commands::edit::run_edit;
use crate::commands::status::{format_status_lines, status_counts};
use crate::error::CliError;
use pretty_assertions::assert_eq;

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn notes_preview_truncates_with_ellipsis() {
    let preview = notes_preview("Fresh pugmarks near the waterhole on the eastern trail", 20);
    assert_eq!(preview, "Fresh pugmarks ne...");
}

#[test]
fn notes_preview_uses_first_line_only() {
    assert_eq!(notes_preview("  herd of 12\nsecond line", 40), "herd of 12");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn normalize_report_identifier_rejects_empty() {
    assert!(matches!(
        normalize_report_identifier("   "),
        Err(CliError::EmptyReportId)
    ));
    assert_eq!(normalize_report_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn status_filter_maps_to_sync_status() {
    assert_eq!(SyncStatus::from(StatusFilter::Pending), SyncStatus::Pending);
    assert_eq!(SyncStatus::from(StatusFilter::Synced), SyncStatus::Synced);
    assert_eq!(SyncStatus::from(StatusFilter::Failed), SyncStatus::Failed);
}

#[test]
fn format_summary_lines_list_failures() {
    let summary = SyncSummary {
        attempted: 3,
        synced: 2,
        failed: 1,
        cancelled: false,
        failures: vec![RecordFailure {
            report_id: ReportId::from("r-1"),
            reason: "reports write failed".to_string(),
        }],
    };

    let lines = format_summary_lines(&summary);
    assert_eq!(lines[0], "Sync finished: 3 attempted, 2 synced, 1 failed");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("r-1"));
    assert!(lines[1].contains("reports write failed"));
}

#[test]
fn format_summary_lines_mention_cancellation() {
    let summary = SyncSummary {
        cancelled: true,
        ..SyncSummary::default()
    };
    let lines = format_summary_lines(&summary);
    assert!(lines.iter().any(|line| line.contains("cancelled")));
}

#[test]
fn status_counts_fill_missing_states() {
    let counts = BTreeMap::from([(SyncStatus::Failed, 2)]);
    assert_eq!(
        status_counts(&counts),
        vec![
            (SyncStatus::Pending, 0),
            (SyncStatus::Failed, 2),
            (SyncStatus::Synced, 0),
        ]
    );
    assert_eq!(format_status_lines(&counts)[1], "failed   2");
}

#[test]
fn report_list_item_derives_total_from_tallies() {
    let mut report = Report::new("ranger-1");
    report.observation_type = Some(ObservationType::Direct);
    report.tallies.male = 2;
    report.tallies.female = 3;

    let item = report_to_list_item(&report);
    assert_eq!(item.total_count, 5);
    assert_eq!(item.observation_type.as_deref(), Some("direct"));
    assert_eq!(item.sync_status, "pending");
}

#[test]
fn format_report_lines_show_status_and_kind() {
    let mut report = Report::new("ranger-1");
    report.observation_type = Some(ObservationType::Loss);
    report.notes = Some("crop raid".to_string());

    let lines = format_report_lines(&[report]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("pending"));
    assert!(lines[0].contains("loss"));
    assert!(lines[0].ends_with("crop raid"));
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn run_edit_requeues_synced_report() {
    let db_path = unique_test_db_path();
    let report = Report::new("ranger-1");
    {
        let db = Database::open(&db_path).await.unwrap();
        let repo = LibSqlReportRepository::new(db.connection());
        repo.create_report(&report, &[]).await.unwrap();
        spoor_core::db::SyncStore::set_report_status(&repo, &report.id, SyncStatus::Synced)
            .await
            .unwrap();
    }

    run_edit(report.id.as_str(), "  tusker seen again ".to_string(), &db_path)
        .await
        .unwrap();

    let db = Database::open(&db_path).await.unwrap();
    let repo = LibSqlReportRepository::new(db.connection());
    let stored = repo.get_report(&report.id).await.unwrap().unwrap();
    assert_eq!(stored.notes.as_deref(), Some("tusker seen again"));
    assert_eq!(stored.sync_status, SyncStatus::Pending);

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn run_edit_rejects_missing_report() {
    let db_path = unique_test_db_path();

    let error = run_edit("missing-report", "notes".to_string(), &db_path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::ReportNotFound(id) if id == "missing-report"));

    cleanup_db_files(&db_path);
}

fn unique_test_db_path() -> PathBuf {
    static NEXT_TEST_DB_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_DB_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("spoor-cli-test-{timestamp}-{sequence}.db"))
}

fn cleanup_db_files(path: &PathBuf) {
    // On Windows, libsql can keep file handles alive briefly after drop.
    if cfg!(windows) {
        return;
    }

    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
}
