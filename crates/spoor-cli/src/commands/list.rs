use std::path::Path;

use spoor_core::db::{LibSqlReportRepository, ReportRepository};
use spoor_core::SyncStatus;

use crate::commands::common::{
    format_report_lines, open_database, report_to_list_item, ReportListItem,
};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    status: Option<SyncStatus>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let reports = LibSqlReportRepository::new(db.connection())
        .list_reports(status, limit)
        .await?;

    if as_json {
        let json_items = reports
            .iter()
            .map(report_to_list_item)
            .collect::<Vec<ReportListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if reports.is_empty() {
        println!("No reports queued.");
    } else {
        for line in format_report_lines(&reports) {
            println!("{line}");
        }
    }

    Ok(())
}
