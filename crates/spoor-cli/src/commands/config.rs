use std::env;

use spoor_core::config::{
    ENV_MEDIA_BUCKET, ENV_REQUEST_TIMEOUT_SECS, ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL,
};

use crate::cli::ConfigCommands;
use crate::config_profiles::{is_http_url, normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values supplied to `config init`, before merging with env and the stored profile.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub media_bucket: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            media_bucket,
            request_timeout_secs,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileInput {
                supabase_url,
                supabase_anon_key,
                media_bucket,
                request_timeout_secs,
            },
            no_activate,
        ),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(input, &existing, |key| env::var(key).ok())?;
    validate_profile(&merged)?;
    *config.profile_mut_or_default(&profile_name) = merged;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `spoor auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Explicit flags win, then `SPOOR_*` env vars, then whatever the profile already holds.
pub fn merge_profile(
    input: ProfileInput,
    existing: &CliProfile,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CliProfile, CliError> {
    let env_timeout = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS))
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                CliError::Config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be a whole number"))
            })
        })
        .transpose()?;

    Ok(CliProfile {
        supabase_url: normalize_text_option(input.supabase_url)
            .or_else(|| normalize_text_option(lookup(ENV_SUPABASE_URL)))
            .or_else(|| existing.supabase_url())
            .map(|url| url.trim_end_matches('/').to_string()),
        supabase_anon_key: normalize_text_option(input.supabase_anon_key)
            .or_else(|| normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)))
            .or_else(|| existing.supabase_anon_key()),
        media_bucket: normalize_text_option(input.media_bucket)
            .or_else(|| normalize_text_option(lookup(ENV_MEDIA_BUCKET)))
            .or_else(|| normalize_text_option(existing.media_bucket.clone())),
        request_timeout_secs: input
            .request_timeout_secs
            .or(env_timeout)
            .or(existing.request_timeout_secs),
    })
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    if profile.request_timeout_secs == Some(0) {
        return Err(CliError::Config(
            "request_timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn merge_prefers_flags_then_env_then_existing() {
        let env = HashMap::from([
            (ENV_SUPABASE_URL, "https://env.supabase.co/"),
            (ENV_MEDIA_BUCKET, "env-bucket"),
        ]);
        let existing = CliProfile {
            supabase_url: Some("https://old.supabase.co".to_string()),
            supabase_anon_key: Some("old-key".to_string()),
            media_bucket: Some("old-bucket".to_string()),
            request_timeout_secs: Some(12),
        };

        let merged = merge_profile(
            ProfileInput {
                media_bucket: Some("flag-bucket".to_string()),
                ..ProfileInput::default()
            },
            &existing,
            |key| env.get(key).map(ToString::to_string),
        )
        .unwrap();

        assert_eq!(
            merged.supabase_url.as_deref(),
            Some("https://env.supabase.co")
        );
        assert_eq!(merged.supabase_anon_key.as_deref(), Some("old-key"));
        assert_eq!(merged.media_bucket.as_deref(), Some("flag-bucket"));
        assert_eq!(merged.request_timeout_secs, Some(12));
    }

    #[test]
    fn merge_rejects_non_numeric_env_timeout() {
        let result = merge_profile(ProfileInput::default(), &CliProfile::default(), |key| {
            (key == ENV_REQUEST_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn validate_rejects_non_http_url_and_zero_timeout() {
        let profile = CliProfile {
            supabase_url: Some("project.supabase.co".to_string()),
            ..CliProfile::default()
        };
        assert!(validate_profile(&profile).is_err());

        let profile = CliProfile {
            request_timeout_secs: Some(0),
            ..CliProfile::default()
        };
        assert!(validate_profile(&profile).is_err());
    }

    #[test]
    fn missing_fields_lists_url_and_key() {
        assert_eq!(
            missing_fields(&CliProfile::default()),
            vec!["supabase_url", "supabase_anon_key"]
        );
    }
}
