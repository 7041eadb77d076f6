//! Report envelope model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::SyncStatus;

/// Default workflow status for a report queued from the capture flow.
pub const DEFAULT_REPORT_STATUS: &str = "submitted";

/// Client-generated report identifier, stable across retries.
///
/// New ids are UUID v7 strings, but ids imported from other capture clients are
/// kept verbatim, so the wrapper does not assume a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    /// Create a new unique report ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What the field team observed, in the capture vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationType {
    /// Animals seen directly
    Direct,
    /// Dung, pugmarks, feeding signs and similar traces
    Indirect,
    /// Crop, livestock or property loss caused by wildlife
    Loss,
}

impl ObservationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
            Self::Loss => "loss",
        }
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "indirect" => Ok(Self::Indirect),
            "loss" => Ok(Self::Loss),
            other => Err(Error::InvalidInput(format!(
                "Unknown observation type: {other}"
            ))),
        }
    }
}

/// Captured coordinates. Latitude and longitude are only ever present together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidInput(format!(
                "Latitude out of range: {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidInput(format!(
                "Longitude out of range: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a point from two nullable columns; a half-filled pair is treated as absent.
    #[must_use]
    pub const fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Animal tallies recorded with an observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tallies {
    pub male: i64,
    pub female: i64,
    pub calf: i64,
    pub unknown: i64,
    pub total: i64,
}

impl Tallies {
    /// Sum of the individual counts, used when the capture flow leaves `total` at zero.
    ///
    /// Saturates at `i64::MAX`; [`Report::validate`] rejects tallies whose sum overflows.
    #[must_use]
    pub const fn counted(&self) -> i64 {
        self.male
            .saturating_add(self.female)
            .saturating_add(self.calf)
            .saturating_add(self.unknown)
    }

    /// Sum of the individual counts, or `None` if it does not fit in an `i64`.
    #[must_use]
    pub fn checked_counted(&self) -> Option<i64> {
        self.male
            .checked_add(self.female)?
            .checked_add(self.calf)?
            .checked_add(self.unknown)
    }
}

/// A field report as stored on the device before it is split into remote rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    /// Owning user; must match the authenticated caller at sync time
    pub user_id: String,
    pub division_id: Option<String>,
    pub range_id: Option<String>,
    pub beat_id: Option<String>,
    pub location: Option<GeoPoint>,
    /// Device-local capture time (Unix ms)
    pub device_timestamp: i64,
    pub notes: Option<String>,
    pub observation_type: Option<ObservationType>,
    pub tallies: Tallies,
    /// Compass bearing in degrees, 0-360
    pub compass_bearing: Option<i64>,
    pub indirect_sign_details: Vec<String>,
    pub loss_type: Vec<String>,
    pub photo_url: Option<String>,
    /// Workflow state (draft/submitted), unrelated to sync
    pub status: String,
    pub sync_status: SyncStatus,
}

impl Report {
    /// Create a new pending report for the given owner, stamped with the current time.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: ReportId::new(),
            user_id: user_id.into(),
            division_id: None,
            range_id: None,
            beat_id: None,
            location: None,
            device_timestamp: chrono::Utc::now().timestamp_millis(),
            notes: None,
            observation_type: None,
            tallies: Tallies::default(),
            compass_bearing: None,
            indirect_sign_details: Vec::new(),
            loss_type: Vec::new(),
            photo_url: None,
            status: DEFAULT_REPORT_STATUS.to_string(),
            sync_status: SyncStatus::Pending,
        }
    }

    /// Validate capture-owned fields before the report is queued or edited.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("Report id cannot be empty".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Report user_id cannot be empty".to_string(),
            ));
        }
        if let Some(point) = self.location {
            GeoPoint::new(point.latitude, point.longitude)?;
        }
        if let Some(bearing) = self.compass_bearing {
            if !(0..=360).contains(&bearing) {
                return Err(Error::InvalidInput(format!(
                    "Compass bearing must be between 0 and 360, got {bearing}"
                )));
            }
        }
        let tallies = self.tallies;
        if [
            tallies.male,
            tallies.female,
            tallies.calf,
            tallies.unknown,
            tallies.total,
        ]
        .iter()
        .any(|count| *count < 0)
        {
            return Err(Error::InvalidInput(
                "Report counts cannot be negative".to_string(),
            ));
        }
        if tallies.checked_counted().is_none() {
            return Err(Error::InvalidInput(
                "Report counts are too large to total".to_string(),
            ));
        }
        Ok(())
    }
}
