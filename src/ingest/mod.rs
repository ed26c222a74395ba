/// Upstream API clients: URL construction and JSON parsing.
///
/// Each provider gets its own file; both normalize into `model::Station`
/// and `model::Measurement`.
///
/// - `luchtmeetnet` — station-centric `/stations` + `/measurements` API
/// - `sensorthings` — OGC SensorThings `Things` / `Observations` API
/// - `fixtures` (test only) — representative response payloads

pub mod luchtmeetnet;
pub mod sensorthings;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Upper bound on followed pages, guarding against pagination links that
/// never terminate.
pub(crate) const MAX_PAGES: u32 = 500;

/// Parses an ISO-8601 timestamp carrying an offset.
///
/// Accepts RFC 3339 (`2023-05-01T13:00:00+02:00`, `...Z`) and the compact
/// `+0200` offset form. SensorThings may report an interval
/// (`start/end`); the start instant is used.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let instant = raw.split('/').next().unwrap_or(raw).trim();
    DateTime::parse_from_rfc3339(instant)
        .or_else(|_| DateTime::parse_from_str(instant, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(instant, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Timestamp field of any JSON type; only strings can parse.
pub(crate) fn parse_timestamp_value(raw: Option<&Value>) -> Option<DateTime<FixedOffset>> {
    match raw? {
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

/// Raw field as it appears in the response, for drop reasons.
pub(crate) fn raw_text(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Reads a concentration that may arrive as a JSON number or a numeric
/// string. Non-finite values are rejected.
pub(crate) fn parse_value(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
