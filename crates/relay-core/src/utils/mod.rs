//! Utility functions

use uuid::Uuid;

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string().replace("-", "").to_uppercase()
}

/// Lower-case an identifier and use underscores as separators
pub fn normalize_identifier(s: &str) -> String {
    s.to_lowercase().replace('-', "_")
}

/// Format a timestamp the way Google APIs expect (RFC 3339, UTC)
pub fn format_rfc3339(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
