//! Report media model

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::{ReportId, SyncStatus};

/// A unique identifier for a media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Create a new unique media ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MediaId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MediaId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A photo captured with a report, held on-device until uploaded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMedia {
    pub id: MediaId,
    /// Parent report identifier.
    pub report_id: ReportId,
    /// Content MIME type.
    pub mime_type: String,
    /// Base64 payload, optionally prefixed with a `data:<mime>;base64,` header.
    pub file_data: String,
    pub sync_status: SyncStatus,
}

impl fmt::Debug for ReportMedia {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReportMedia")
            .field("id", &self.id)
            .field("report_id", &self.report_id)
            .field("mime_type", &self.mime_type)
            .field("file_data_len", &self.file_data.len())
            .field("sync_status", &self.sync_status)
            .finish()
    }
}

impl ReportMedia {
    /// Build a pending media row from raw bytes.
    pub fn from_bytes(
        report_id: ReportId,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self> {
        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "Media mime_type cannot be empty".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(Error::InvalidInput(
                "Media payload cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: MediaId::new(),
            report_id,
            mime_type,
            file_data: STANDARD.encode(bytes),
            sync_status: SyncStatus::Pending,
        })
    }

    /// Decode the stored text payload back to binary.
    pub fn decode_payload(&self) -> Result<Vec<u8>> {
        let encoded = strip_data_url_header(&self.file_data);
        STANDARD
            .decode(encoded.trim())
            .map_err(|error| Error::InvalidInput(format!("Media {} payload: {error}", self.id)))
    }
}

fn strip_data_url_header(raw: &str) -> &str {
    if raw.starts_with("data:") {
        raw.split_once(',').map_or(raw, |(_, payload)| payload)
    } else {
        raw
    }
}
