//! Checks applied before anything derived from a local id or payload leaves the device.

use std::sync::OnceLock;

use regex::Regex;

/// MIME types accepted for media upload.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

fn safe_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"))
}

/// Whether `value` is safe to embed in a storage path or remote id.
#[must_use]
pub fn is_safe_identifier(value: &str) -> bool {
    safe_identifier_pattern().is_match(value)
}

#[must_use]
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}
