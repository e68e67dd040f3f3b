use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::BroadcastId;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Parse an IANA timezone name, falling back to UTC with a warning.
pub fn parse_timezone(tz_name: &str) -> Tz {
    tz_name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", tz_name);
        Tz::UTC
    })
}

/// Current wall-clock time as unix seconds.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

// ── Archive naming ────────────────────────────────────────────────────────────

/// Render a unix timestamp as a local ISO-8601 datetime to the second, with
/// the colons removed (`2024-03-01T210503`).
///
/// Out-of-range timestamps render as the unix epoch.
pub fn archive_timestamp(start_timestamp: f64, tz: Tz) -> String {
    let secs = start_timestamp.floor() as i64;
    let utc = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();
    utc.with_timezone(&tz)
        .format("%Y-%m-%dT%H%M%S")
        .to_string()
}

/// Base file name (without extension) used for every archive file of a
/// broadcast: `{start time}_{id}`, with the id reduced to
/// [`BroadcastId::file_stem`].
pub fn archive_basename(start_timestamp: f64, id: &BroadcastId, tz: Tz) -> String {
    format!("{}_{}", archive_timestamp(start_timestamp, tz), id.file_stem())
}

// ── Tests ────────────────────────────────────────────────────────────────────
