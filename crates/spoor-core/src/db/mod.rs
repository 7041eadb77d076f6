//! Local durable store for queued reports

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LibSqlReportRepository, ReportRepository, SyncStore, UndecodedReport};
