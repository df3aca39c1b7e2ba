//! Plausibility checks for raw readings and timestamp parsing.
//!
//! Raw values arrive as decoded JSON, so a temperature may be a number, a
//! numeric string, or something that is not a number at all. Everything in
//! this module is pure.

use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

/// Temperature reported by stations whose sensor failed.
pub const TEMPERATURE_SENTINEL: f64 = -999.0;

/// Plausible temperatures in °C, inclusive.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -50.0..=60.0;

/// Plausible relative humidity in %, inclusive.
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Timestamp layouts carrying an explicit offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Timestamp layouts without an offset; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Outcome of validating one reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// True when no check failed.
    pub ok: bool,
    /// Failure messages, temperature first.
    pub errors: Vec<String>,
}

/// Coerce a raw JSON value into a number.
///
/// Numbers pass through; strings are parsed as decimal floats after trimming.
/// Anything else (null, booleans, arrays, objects) is not a number.
pub fn parse_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Range predicate for temperatures, without sentinel handling.
pub fn is_valid_temperature(t: f64) -> bool {
    TEMPERATURE_RANGE.contains(&t)
}

/// Range predicate for humidity.
pub fn is_valid_humidity(h: f64) -> bool {
    HUMIDITY_RANGE.contains(&h)
}

/// Check a temperature/humidity pair.
///
/// Both fields are checked independently, so a reading can collect one
/// message per field. NaN and infinities fail the range checks.
pub fn validate_reading(temperature: &Value, humidity: &Value) -> Validation {
    let mut errors = Vec::new();

    match parse_number(temperature) {
        Some(t) if t == TEMPERATURE_SENTINEL || !is_valid_temperature(t) => {
            errors.push(format!("invalid temperature {:?}", t));
        }
        Some(_) => {}
        None => errors.push(format!("temperature not a number: {}", display_raw(temperature))),
    }

    match parse_number(humidity) {
        Some(h) if !is_valid_humidity(h) => {
            errors.push(format!("invalid humidity {:?}", h));
        }
        Some(_) => {}
        None => errors.push(format!("humidity not a number: {}", display_raw(humidity))),
    }

    Validation {
        ok: errors.is_empty(),
        errors,
    }
}

/// Parse a sender timestamp into a UTC instant.
///
/// Only strings are accepted. Returns `None` on any failure.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// Parse an ISO-8601 style string.
///
/// A trailing `Z` means UTC, explicit offsets are honoured, and values
/// without an offset are taken to be UTC already.
pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // chrono's `%z` does not accept a literal `Z`
    let naive_input = raw.strip_suffix('Z').unwrap_or(raw);
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_input, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Render a raw value for an error message; strings appear without quotes.
fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
