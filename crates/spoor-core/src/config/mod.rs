//! Remote service configuration.
//!
//! `RemoteConfig` carries the public Supabase endpoint, anon key, and media
//! bucket needed by the sync engine. Secret credentials never live here; the
//! per-user access token comes from the auth session.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SPOOR_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SPOOR_SUPABASE_ANON_KEY";
pub const ENV_MEDIA_BUCKET: &str = "SPOOR_MEDIA_BUCKET";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SPOOR_REQUEST_TIMEOUT_SECS";

/// Storage bucket used when none is configured.
pub const DEFAULT_MEDIA_BUCKET: &str = "report-media";
/// Upper bound on a single remote call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Supabase project settings for the remote upsert protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project base URL, without trailing slash.
    pub supabase_url: String,
    pub anon_key: String,
    pub media_bucket: String,
    pub request_timeout_secs: u64,
}

impl RemoteConfig {
    /// Build a config from explicit values, normalizing the URL.
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let supabase_url = normalize_base_url(supabase_url.into(), ENV_SUPABASE_URL)?;
        let anon_key = normalize_text_option(Some(anon_key.into())).ok_or_else(|| {
            Error::InvalidInput(format!("{ENV_SUPABASE_ANON_KEY} must not be empty"))
        })?;

        Ok(Self {
            supabase_url,
            anon_key,
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no remote variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `PostgREST` endpoint for a table.
    #[must_use]
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.supabase_url)
    }

    /// Storage endpoint for an object in the media bucket.
    #[must_use]
    pub fn object_url(&self, object_path: &str) -> String {
        let encoded = object_path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/storage/v1/object/{}/{encoded}",
            self.supabase_url,
            urlencoding::encode(&self.media_bucket)
        )
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<RemoteConfig>> {
    let supabase_url = normalize_text_option(lookup(ENV_SUPABASE_URL));
    let anon_key = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY));
    let media_bucket = normalize_text_option(lookup(ENV_MEDIA_BUCKET));
    let timeout = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS));

    if supabase_url.is_none() && anon_key.is_none() && media_bucket.is_none() && timeout.is_none()
    {
        return Ok(None);
    }

    let (supabase_url, anon_key) = match (supabase_url, anon_key) {
        (Some(url), Some(key)) => (url, key),
        (url, key) => {
            let mut missing = Vec::new();
            if url.is_none() {
                missing.push(ENV_SUPABASE_URL);
            }
            if key.is_none() {
                missing.push(ENV_SUPABASE_ANON_KEY);
            }
            return Err(Error::InvalidInput(format!(
                "Remote configuration is incomplete. Missing: {}",
                missing.join(", ")
            )));
        }
    };

    let mut config = RemoteConfig::new(supabase_url, anon_key)?;
    if let Some(bucket) = media_bucket {
        config.media_bucket = bucket;
    }
    if let Some(raw) = timeout {
        config.request_timeout_secs = parse_timeout(&raw)?;
    }
    Ok(Some(config))
}

fn parse_timeout(raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(Error::InvalidInput(format!(
            "{ENV_REQUEST_TIMEOUT_SECS} must be a positive number of seconds, got '{raw}'"
        ))),
    }
}

fn normalize_base_url(raw: String, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput(format!("{field} must not be empty")))?;
    if !is_http_url(&value) {
        return Err(Error::InvalidInput(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}
