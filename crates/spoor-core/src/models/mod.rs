//! Data models for Spoor

mod media;
mod report;
mod sync_status;

pub use media::{MediaId, ReportMedia};
pub use report::{
    GeoPoint, ObservationType, Report, ReportId, Tallies, DEFAULT_REPORT_STATUS,
};
pub use sync_status::SyncStatus;
