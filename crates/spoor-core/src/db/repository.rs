//! Report queue repository implementation

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{
    GeoPoint, MediaId, ObservationType, Report, ReportId, ReportMedia, SyncStatus, Tallies,
};
use libsql::{params, Connection, Row};

const REPORT_COLUMNS: &str = "id, user_id, division_id, range_id, beat_id, latitude, longitude,
    device_timestamp, observation_type, male_count, female_count, calf_count, unknown_count,
    total_count, compass_bearing, indirect_sign_details, loss_type, photo_url, notes, status,
    sync_status";

const MEDIA_COLUMNS: &str = "id, report_id, mime_type, file_data, sync_status";

/// Capture-side operations on the report queue (async)
#[allow(async_fn_in_trait)]
pub trait ReportRepository {
    /// Queue a report together with its media; either everything commits or nothing does
    async fn create_report(&self, report: &Report, media: &[ReportMedia]) -> Result<()>;

    /// Get a report by ID
    async fn get_report(&self, id: &ReportId) -> Result<Option<Report>>;

    /// List reports, newest capture first, optionally filtered by sync status
    async fn list_reports(&self, status: Option<SyncStatus>, limit: usize) -> Result<Vec<Report>>;

    /// Replace a report's notes as an explicit user edit, re-queueing it for sync
    async fn update_report_notes(&self, id: &ReportId, notes: Option<&str>) -> Result<Report>;

    /// Number of reports in each sync state
    async fn count_by_sync_status(&self) -> Result<BTreeMap<SyncStatus, usize>>;
}

/// A queued row that exists but could not be read back into a [`Report`].
#[derive(Debug)]
pub struct UndecodedReport {
    pub id: ReportId,
    pub error: Error,
}

/// The narrow view of the queue a sync run needs.
///
/// Status updates touch exactly one column of one row, so each is atomic on its own.
#[allow(async_fn_in_trait)]
pub trait SyncStore {
    /// All reports whose sync status is `pending` or `failed`.
    ///
    /// Rows are decoded one at a time so a single corrupt row surfaces as an
    /// [`UndecodedReport`] instead of hiding the rest of the queue.
    async fn list_pending(&self) -> Result<Vec<std::result::Result<Report, UndecodedReport>>>;

    /// All media attached to a report
    async fn list_media(&self, report_id: &ReportId) -> Result<Vec<ReportMedia>>;

    async fn set_report_status(&self, id: &ReportId, status: SyncStatus) -> Result<()>;

    async fn set_media_status(&self, id: &MediaId, status: SyncStatus) -> Result<()>;
}

/// libSQL implementation of `ReportRepository` and `SyncStore`
pub struct LibSqlReportRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlReportRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn insert_report(&self, report: &Report) -> Result<()> {
        let (latitude, longitude) = report
            .location
            .map_or((None, None), |point| (Some(point.latitude), Some(point.longitude)));

        self.conn
            .execute(
                &format!(
                    "INSERT INTO reports ({REPORT_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    report.id.as_str(),
                    report.user_id.as_str(),
                    report.division_id.clone(),
                    report.range_id.clone(),
                    report.beat_id.clone(),
                    latitude,
                    longitude,
                    report.device_timestamp,
                    report.observation_type.map(|kind| kind.as_str().to_string()),
                    report.tallies.male,
                    report.tallies.female,
                    report.tallies.calf,
                    report.tallies.unknown,
                    report.tallies.total,
                    report.compass_bearing,
                    serde_json::to_string(&report.indirect_sign_details)?,
                    serde_json::to_string(&report.loss_type)?,
                    report.photo_url.clone(),
                    report.notes.clone(),
                    report.status.as_str(),
                    report.sync_status.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn insert_media(&self, media: &ReportMedia) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO report_media ({MEDIA_COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
                params![
                    media.id.as_str(),
                    media.report_id.as_str(),
                    media.mime_type.as_str(),
                    media.file_data.as_str(),
                    media.sync_status.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn query_reports(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Report>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next().await? {
            reports.push(Self::parse_report(&row)?);
        }
        Ok(reports)
    }

    /// Parse a report from a database row selected with `REPORT_COLUMNS`
    fn parse_report(row: &Row) -> Result<Report> {
        let observation_type = row
            .get::<Option<String>>(8)?
            .map(|raw| raw.parse::<ObservationType>())
            .transpose()?;
        let indirect_sign_details: Vec<String> = serde_json::from_str(&row.get::<String>(15)?)?;
        let loss_type: Vec<String> = serde_json::from_str(&row.get::<String>(16)?)?;

        Ok(Report {
            id: ReportId::from(row.get::<String>(0)?),
            user_id: row.get(1)?,
            division_id: row.get(2)?,
            range_id: row.get(3)?,
            beat_id: row.get(4)?,
            location: GeoPoint::from_columns(row.get(5)?, row.get(6)?),
            device_timestamp: row.get(7)?,
            observation_type,
            tallies: Tallies {
                male: row.get(9)?,
                female: row.get(10)?,
                calf: row.get(11)?,
                unknown: row.get(12)?,
                total: row.get(13)?,
            },
            compass_bearing: row.get(14)?,
            indirect_sign_details,
            loss_type,
            photo_url: row.get(17)?,
            notes: row.get(18)?,
            status: row.get(19)?,
            sync_status: row.get::<String>(20)?.parse()?,
        })
    }

    fn parse_media(row: &Row) -> Result<ReportMedia> {
        Ok(ReportMedia {
            id: MediaId::from(row.get::<String>(0)?),
            report_id: ReportId::from(row.get::<String>(1)?),
            mime_type: row.get(2)?,
            file_data: row.get(3)?,
            sync_status: row.get::<String>(4)?.parse()?,
        })
    }
}

impl ReportRepository for LibSqlReportRepository<'_> {
    async fn create_report(&self, report: &Report, media: &[ReportMedia]) -> Result<()> {
        report.validate()?;
        if let Some(orphan) = media.iter().find(|item| item.report_id != report.id) {
            return Err(Error::InvalidInput(format!(
                "Media {} does not belong to report {}",
                orphan.id, report.id
            )));
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let mut result = self.insert_report(report).await;
        for item in media {
            if result.is_err() {
                break;
            }
            result = self.insert_media(item).await;
        }

        if let Err(e) = result {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::debug!(
            report_id = %report.id,
            media = media.len(),
            "Queued report for sync"
        );
        Ok(())
    }

    async fn get_report(&self, id: &ReportId) -> Result<Option<Report>> {
        let mut reports = self
            .query_reports(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?"),
                [id.as_str()],
            )
            .await?;
        Ok(reports.pop())
    }

    #[allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT
    async fn list_reports(&self, status: Option<SyncStatus>, limit: usize) -> Result<Vec<Report>> {
        match status {
            Some(status) => {
                self.query_reports(
                    &format!(
                        "SELECT {REPORT_COLUMNS} FROM reports
                         WHERE sync_status = ?
                         ORDER BY device_timestamp DESC
                         LIMIT ?"
                    ),
                    params![status.as_str(), limit as i64],
                )
                .await
            }
            None => {
                self.query_reports(
                    &format!(
                        "SELECT {REPORT_COLUMNS} FROM reports
                         ORDER BY device_timestamp DESC
                         LIMIT ?"
                    ),
                    params![limit as i64],
                )
                .await
            }
        }
    }

    async fn update_report_notes(&self, id: &ReportId, notes: Option<&str>) -> Result<Report> {
        let mut report = self
            .get_report(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        report.notes = notes
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string);
        report.sync_status = SyncStatus::Pending;
        report.validate()?;

        let rows = self
            .conn
            .execute(
                "UPDATE reports SET notes = ?, sync_status = ? WHERE id = ?",
                params![report.notes.clone(), report.sync_status.as_str(), id.as_str()],
            )
            .await?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(report)
    }

    async fn count_by_sync_status(&self) -> Result<BTreeMap<SyncStatus, usize>> {
        let mut rows = self
            .conn
            .query(
                "SELECT sync_status, COUNT(*) FROM reports GROUP BY sync_status",
                (),
            )
            .await?;

        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let status: SyncStatus = row.get::<String>(0)?.parse()?;
            let count = usize::try_from(row.get::<i64>(1)?).unwrap_or_default();
            counts.insert(status, count);
        }
        Ok(counts)
    }
}

impl SyncStore for LibSqlReportRepository<'_> {
    async fn list_pending(&self) -> Result<Vec<std::result::Result<Report, UndecodedReport>>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM reports
                     WHERE sync_status IN ('pending', 'failed')
                     ORDER BY device_timestamp ASC"
                ),
                (),
            )
            .await?;

        let mut reports = Vec::new();
        while let Some(row) = rows.next().await? {
            let id = ReportId::from(row.get::<String>(0)?);
            reports.push(Self::parse_report(&row).map_err(|error| {
                tracing::warn!(report_id = %id, "Queued report could not be decoded: {error}");
                UndecodedReport { id, error }
            }));
        }
        Ok(reports)
    }

    async fn list_media(&self, report_id: &ReportId) -> Result<Vec<ReportMedia>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {MEDIA_COLUMNS} FROM report_media WHERE report_id = ? ORDER BY rowid"
                ),
                [report_id.as_str()],
            )
            .await?;

        let mut media = Vec::new();
        while let Some(row) = rows.next().await? {
            media.push(Self::parse_media(&row)?);
        }
        Ok(media)
    }

    async fn set_report_status(&self, id: &ReportId, status: SyncStatus) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE reports SET sync_status = ? WHERE id = ?",
                [status.as_str(), id.as_str()],
            )
            .await?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_media_status(&self, id: &MediaId, status: SyncStatus) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE report_media SET sync_status = ? WHERE id = ?",
                [status.as_str(), id.as_str()],
            )
            .await?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample_report(user_id: &str) -> Report {
        let mut report = Report::new(user_id);
        report.division_id = Some("div-1".to_string());
        report.location = Some(GeoPoint {
            latitude: 11.41,
            longitude: 76.69,
        });
        report.observation_type = Some(ObservationType::Direct);
        report.tallies = Tallies {
            male: 1,
            female: 2,
            calf: 1,
            unknown: 0,
            total: 4,
        };
        report.compass_bearing = Some(270);
        report.indirect_sign_details = vec!["Dung".to_string()];
        report.loss_type = vec!["crop".to_string()];
        report.notes = Some("Herd near waterhole".to_string());
        report
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get_round_trips_fields() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let report = sample_report("ranger-1");
        repo.create_report(&report, &[]).await.unwrap();

        let fetched = repo.get_report(&report.id).await.unwrap().unwrap();
        assert_eq!(fetched, report);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_report_with_media_is_atomic() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let report = sample_report("ranger-1");
        let first = ReportMedia::from_bytes(report.id.clone(), "image/jpeg", b"one").unwrap();
        let mut duplicate = ReportMedia::from_bytes(report.id.clone(), "image/jpeg", b"two").unwrap();
        duplicate.id = first.id.clone();

        let result = repo.create_report(&report, &[first, duplicate]).await;
        assert!(result.is_err());

        assert!(repo.get_report(&report.id).await.unwrap().is_none());
        assert!(repo.list_media(&report.id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_rejects_media_for_other_report() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let report = sample_report("ranger-1");
        let stray = ReportMedia::from_bytes(ReportId::from("other"), "image/png", b"x").unwrap();

        assert!(repo.create_report(&report, &[stray]).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_pending_includes_failed() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let pending = sample_report("ranger-1");
        let failed = sample_report("ranger-1");
        let synced = sample_report("ranger-1");
        for report in [&pending, &failed, &synced] {
            repo.create_report(report, &[]).await.unwrap();
        }
        repo.set_report_status(&failed.id, SyncStatus::Failed)
            .await
            .unwrap();
        repo.set_report_status(&synced.id, SyncStatus::Synced)
            .await
            .unwrap();

        let mut ids: Vec<String> = repo
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|report| report.unwrap().id.to_string())
            .collect();
        ids.sort();
        let mut expected = vec![pending.id.to_string(), failed.id.to_string()];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_pending_keeps_undecodable_rows_by_id() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let mut good = sample_report("ranger-1");
        good.device_timestamp = 1;
        repo.create_report(&good, &[]).await.unwrap();
        db.connection()
            .execute(
                "INSERT INTO reports (id, user_id, device_timestamp, observation_type)
                 VALUES ('bad', 'ranger-1', 2, 'direct_sighting')",
                (),
            )
            .await
            .unwrap();

        let pending = repo.list_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].as_ref().unwrap().id, good.id);
        let undecoded = pending[1].as_ref().unwrap_err();
        assert_eq!(undecoded.id, ReportId::from("bad"));
        assert!(matches!(undecoded.error, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_media_status() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let report = sample_report("ranger-1");
        let media = ReportMedia::from_bytes(report.id.clone(), "image/jpeg", b"jpeg").unwrap();
        repo.create_report(&report, std::slice::from_ref(&media))
            .await
            .unwrap();

        repo.set_media_status(&media.id, SyncStatus::Synced)
            .await
            .unwrap();

        let stored = repo.list_media(&report.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sync_status, SyncStatus::Synced);
        assert_eq!(stored[0].decode_payload().unwrap(), b"jpeg");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_status_unknown_row_is_not_found() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let result = repo
            .set_report_status(&ReportId::from("missing"), SyncStatus::Synced)
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_notes_requeues_report() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let report = sample_report("ranger-1");
        repo.create_report(&report, &[]).await.unwrap();
        repo.set_report_status(&report.id, SyncStatus::Synced)
            .await
            .unwrap();

        let updated = repo
            .update_report_notes(&report.id, Some("  Tusker crossed road  "))
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Tusker crossed road"));
        assert_eq!(updated.sync_status, SyncStatus::Pending);

        let fetched = repo.get_report(&report.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_status, SyncStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deleting_report_cascades_to_media() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let report = sample_report("ranger-1");
        let media = ReportMedia::from_bytes(report.id.clone(), "image/jpeg", b"jpeg").unwrap();
        repo.create_report(&report, &[media]).await.unwrap();

        db.connection()
            .execute("DELETE FROM reports WHERE id = ?", [report.id.as_str()])
            .await
            .unwrap();

        assert!(repo.list_media(&report.id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_count_and_list_by_status() {
        let db = setup().await;
        let repo = LibSqlReportRepository::new(db.connection());

        let first = sample_report("ranger-1");
        let second = sample_report("ranger-1");
        repo.create_report(&first, &[]).await.unwrap();
        repo.create_report(&second, &[]).await.unwrap();
        repo.set_report_status(&second.id, SyncStatus::Failed)
            .await
            .unwrap();

        let counts = repo.count_by_sync_status().await.unwrap();
        assert_eq!(counts.get(&SyncStatus::Pending), Some(&1));
        assert_eq!(counts.get(&SyncStatus::Failed), Some(&1));
        assert_eq!(counts.get(&SyncStatus::Synced), None);

        let failed = repo
            .list_reports(Some(SyncStatus::Failed), 10)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, second.id);
        assert_eq!(repo.list_reports(None, 10).await.unwrap().len(), 2);
    }
}
