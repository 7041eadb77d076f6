//! Supabase `PostgREST` and Storage implementation of the upsert protocol.

use std::fmt;

use reqwest::{header, Client, RequestBuilder, Response};
use serde::Serialize;

use crate::config::RemoteConfig;
use crate::util::parse_api_error;

use super::rows::{tables, REMOTE_STATUS_FAILED};
use super::{
    DamageRow, MediaRow, ObservationRow, RemoteError, RemoteResult, RemoteStore, ReportRow,
};

const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

/// Remote store acting on behalf of one signed-in user.
#[derive(Clone)]
pub struct SupabaseRemote {
    config: RemoteConfig,
    access_token: String,
    client: Client,
}

impl fmt::Debug for SupabaseRemote {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseRemote")
            .field("supabase_url", &self.config.supabase_url)
            .field("media_bucket", &self.config.media_bucket)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseRemote {
    pub fn new(config: RemoteConfig, access_token: impl Into<String>) -> RemoteResult<Self> {
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "access token must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            config,
            access_token,
            client,
        })
    }

    /// A client carrying only the anon key, enough for reachability probes.
    pub fn anonymous(config: RemoteConfig) -> RemoteResult<Self> {
        let anon_key = config.anon_key.clone();
        Self::new(config, anon_key)
    }

    #[must_use]
    pub const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Whether the project endpoint answers at all.
    ///
    /// Any HTTP response below 500 counts as reachable; the probe does not
    /// check authorization.
    pub async fn is_reachable(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/rest/v1/", self.config.supabase_url))
            .header("apikey", &self.config.anon_key);

        match request.send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(error) => {
                tracing::debug!("Remote probe failed: {}", error);
                false
            }
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.access_token)
    }

    async fn upsert<T: Serialize + Sync>(&self, table: &str, row: &T) -> RemoteResult<()> {
        let request = self.authorized(
            self.client
                .post(self.config.rest_url(table))
                .query(&[("on_conflict", "id")])
                .header("Prefer", PREFER_MERGE)
                .json(row),
        );
        let response = request.send().await?;
        ensure_success(table, response).await
    }
}

impl RemoteStore for SupabaseRemote {
    async fn upsert_report(&self, row: &ReportRow) -> RemoteResult<()> {
        self.upsert(tables::REPORTS, row).await
    }

    async fn upsert_observation(&self, row: &ObservationRow) -> RemoteResult<()> {
        self.upsert(tables::OBSERVATIONS, row).await
    }

    async fn upsert_damage(&self, row: &DamageRow) -> RemoteResult<()> {
        self.upsert(tables::DAMAGES, row).await
    }

    async fn upload_media(
        &self,
        path: &str,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> RemoteResult<()> {
        let request = self.authorized(
            self.client
                .post(self.config.object_url(path))
                .header(header::CONTENT_TYPE, mime_type)
                .header("x-upsert", "true")
                .body(bytes),
        );
        let response = request.send().await?;
        ensure_success(&format!("{}/{path}", self.config.media_bucket), response).await
    }

    async fn upsert_media_metadata(&self, row: &MediaRow) -> RemoteResult<()> {
        self.upsert(tables::MEDIA, row).await
    }

    async fn mark_report_failed(&self, report_id: &str) -> RemoteResult<()> {
        let request = self.authorized(
            self.client
                .patch(self.config.rest_url(tables::REPORTS))
                .query(&[("id", format!("eq.{report_id}"))])
                .header("Prefer", "return=minimal")
                .json(&serde_json::json!({ "status": REMOTE_STATUS_FAILED })),
        );
        let response = request.send().await?;
        ensure_success(tables::REPORTS, response).await
    }
}

async fn ensure_success(target: &str, response: Response) -> RemoteResult<()> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        target: target.to_string(),
        message: parse_api_error(status, &body),
    })
}
