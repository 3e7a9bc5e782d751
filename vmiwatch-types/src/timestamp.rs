//! ISO-8601 timestamp parsing.
//!
//! The backend emits a mix of formats: offset-qualified RFC 3339 strings,
//! Python `isoformat()` output without an offset, and SQLite
//! `CURRENT_TIMESTAMP` values with a space separator. Naive values carry no
//! zone and are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::Timestamp;

/// Naive formats accepted after RFC 3339 fails (order matters: most common first).
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a backend timestamp into a UTC instant.
///
/// Returns `None` if the string matches none of the accepted formats.
pub fn parse(s: &str) -> Option<Timestamp> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Serde adapter for `#[serde(with = "vmiwatch_types::timestamp")]`.
#[cfg(feature = "serde")]
pub fn serialize<S>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339())
}

/// Serde adapter for `#[serde(with = "vmiwatch_types::timestamp")]`.
#[cfg(feature = "serde")]
pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}
