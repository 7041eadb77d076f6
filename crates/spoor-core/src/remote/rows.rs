//! Remote row shapes and the deterministic ids that key them.
//!
//! Every secondary id is a pure function of the parent report (and media) id,
//! so replaying a write after a crash targets the same remote row.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::models::{GeoPoint, MediaId, ObservationType, Report, ReportId, ReportMedia};

/// Remote table names.
pub mod tables {
    pub const REPORTS: &str = "reports";
    pub const OBSERVATIONS: &str = "observations";
    pub const DAMAGES: &str = "damages";
    pub const MEDIA: &str = "report_media";
}

/// Remote workflow status written when a record's later steps fail.
pub const REMOTE_STATUS_FAILED: &str = "failed";

#[must_use]
pub fn observation_id(report_id: &ReportId) -> String {
    format!("obs-{report_id}")
}

/// `index` is the zero-based position in the report's loss list.
#[must_use]
pub fn damage_id(report_id: &ReportId, index: usize) -> String {
    format!("dmg-{report_id}-{index}")
}

#[must_use]
pub fn media_object_path(report_id: &ReportId, media_id: &MediaId) -> String {
    format!("{report_id}/{media_id}.jpg")
}

/// Well-known-text point, longitude first.
#[must_use]
pub fn geo_point(location: Option<GeoPoint>) -> Option<String> {
    location.map(|point| format!("POINT({} {})", point.longitude, point.latitude))
}

/// Observation kinds in the remote vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteObservationType {
    DirectSighting,
    IndirectSign,
    ConflictLoss,
}

impl From<ObservationType> for RemoteObservationType {
    fn from(value: ObservationType) -> Self {
        match value {
            ObservationType::Direct => Self::DirectSighting,
            ObservationType::Indirect => Self::IndirectSign,
            ObservationType::Loss => Self::ConflictLoss,
        }
    }
}

/// Damage category derived from a capture-side loss label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageCategory {
    None,
    Crop,
    Livestock,
    Property,
}

impl DamageCategory {
    /// Labels are matched case-insensitively; anything unrecognised is property damage.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "no loss" => Self::None,
            "crop" => Self::Crop,
            "livestock" => Self::Livestock,
            _ => Self::Property,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub user_id: String,
    pub division_id: Option<String>,
    pub range_id: Option<String>,
    pub beat_id: Option<String>,
    pub location: Option<String>,
    /// RFC 3339 capture time
    pub device_timestamp: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub status: String,
}

impl From<&Report> for ReportRow {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.to_string(),
            user_id: report.user_id.clone(),
            division_id: report.division_id.clone(),
            range_id: report.range_id.clone(),
            beat_id: report.beat_id.clone(),
            location: geo_point(report.location),
            device_timestamp: DateTime::from_timestamp_millis(report.device_timestamp)
                .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true)),
            notes: report.notes.clone(),
            photo_url: report.photo_url.clone(),
            status: report.status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub id: String,
    pub report_id: String,
    pub observation_type: RemoteObservationType,
    pub male_count: i64,
    pub female_count: i64,
    pub calf_count: i64,
    pub unknown_count: i64,
    pub total_count: i64,
    pub compass_bearing: Option<i64>,
    pub indirect_sign_details: Vec<String>,
}

impl ObservationRow {
    /// `None` when the report carries no observation kind.
    #[must_use]
    pub fn from_report(report: &Report) -> Option<Self> {
        let kind = report.observation_type?;
        let tallies = report.tallies;
        let total_count = if tallies.total == 0 {
            tallies.counted()
        } else {
            tallies.total
        };

        Some(Self {
            id: observation_id(&report.id),
            report_id: report.id.to_string(),
            observation_type: kind.into(),
            male_count: tallies.male,
            female_count: tallies.female,
            calf_count: tallies.calf,
            unknown_count: tallies.unknown,
            total_count,
            compass_bearing: report.compass_bearing,
            indirect_sign_details: report.indirect_sign_details.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRow {
    pub id: String,
    pub report_id: String,
    pub category: DamageCategory,
    /// The label as captured
    pub loss_type: String,
}

impl DamageRow {
    /// One row per loss label, in capture order.
    #[must_use]
    pub fn for_report(report: &Report) -> Vec<Self> {
        report
            .loss_type
            .iter()
            .enumerate()
            .map(|(index, label)| Self {
                id: damage_id(&report.id, index),
                report_id: report.id.to_string(),
                category: DamageCategory::from_label(label),
                loss_type: label.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRow {
    pub id: String,
    pub report_id: String,
    pub storage_path: String,
    pub mime_type: String,
}

impl MediaRow {
    #[must_use]
    pub fn new(media: &ReportMedia, storage_path: impl Into<String>) -> Self {
        Self {
            id: media.id.to_string(),
            report_id: media.report_id.to_string(),
            storage_path: storage_path.into(),
            mime_type: media.mime_type.clone(),
        }
    }
}
