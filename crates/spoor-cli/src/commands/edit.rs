use std::path::Path;

use spoor_core::db::{LibSqlReportRepository, ReportRepository};
use spoor_core::util::normalize_text_option;
use spoor_core::ReportId;

use crate::commands::common::{normalize_report_identifier, open_database};
use crate::error::CliError;

pub async fn run_edit(id: &str, notes: String, db_path: &Path) -> Result<(), CliError> {
    let report_id = ReportId::from(normalize_report_identifier(id)?);
    let db = open_database(db_path).await?;
    let repo = LibSqlReportRepository::new(db.connection());

    if repo.get_report(&report_id).await?.is_none() {
        return Err(CliError::ReportNotFound(report_id.to_string()));
    }

    let notes = normalize_text_option(Some(notes));
    let updated = repo
        .update_report_notes(&report_id, notes.as_deref())
        .await?;
    println!("{} ({})", updated.id, updated.sync_status);
    Ok(())
}
