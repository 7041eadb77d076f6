use std::path::Path;

use spoor_core::db::{LibSqlReportRepository, ReportRepository};
use spoor_core::models::{GeoPoint, Tallies};
use spoor_core::sync::is_allowed_mime_type;
use spoor_core::util::normalize_text_option;
use spoor_core::{Report, ReportMedia};

use crate::auth::load_stored_session;
use crate::cli::AddArgs;
use crate::commands::common::{open_database, resolve_profile_name};
use crate::error::CliError;

pub async fn run_add(
    args: AddArgs,
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let user_id = match normalize_text_option(args.user_id.clone()) {
        Some(user_id) => user_id,
        None => {
            let profile_name = resolve_profile_name(profile)?;
            load_stored_session(&profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?
                .map(|session| session.user.id)
                .ok_or(CliError::NotSignedIn)?
        }
    };

    let report = build_report(user_id, &args)?;
    let media = args
        .photos
        .iter()
        .map(|path| load_photo(&report, path))
        .collect::<Result<Vec<_>, _>>()?;

    let db = open_database(db_path).await?;
    LibSqlReportRepository::new(db.connection())
        .create_report(&report, &media)
        .await?;

    println!("{}", report.id);
    Ok(())
}

pub fn build_report(user_id: String, args: &AddArgs) -> Result<Report, CliError> {
    let mut report = Report::new(user_id);
    report.division_id = normalize_text_option(args.division.clone());
    report.range_id = normalize_text_option(args.range.clone());
    report.beat_id = normalize_text_option(args.beat.clone());
    report.location = match (args.latitude, args.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)?),
        _ => None,
    };
    report.observation_type = args.observation_type.map(Into::into);

    let mut tallies = Tallies {
        male: args.male,
        female: args.female,
        calf: args.calf,
        unknown: args.unknown,
        total: 0,
    };
    tallies.total = args.total.unwrap_or_else(|| tallies.counted());
    report.tallies = tallies;

    report.compass_bearing = args.bearing;
    report.indirect_sign_details = normalize_labels(&args.signs);
    report.loss_type = normalize_labels(&args.losses);
    report.notes = normalize_text_option(args.notes.clone());

    report.validate()?;
    Ok(report)
}

fn normalize_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .filter_map(|label| normalize_text_option(Some(label.clone())))
        .collect()
}

fn load_photo(report: &Report, path: &Path) -> Result<ReportMedia, CliError> {
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .filter(|mime| is_allowed_mime_type(mime))
        .ok_or_else(|| CliError::UnsupportedPhoto(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    Ok(ReportMedia::from_bytes(report.id.clone(), mime_type, &bytes)?)
}
