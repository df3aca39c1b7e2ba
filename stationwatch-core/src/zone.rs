//! Timezone used to derive local hour and date keys.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::error::ZoneParseError;

/// Format of hourly bucket keys.
pub const HOUR_KEY_FORMAT: &str = "%Y-%m-%d %H:00";
/// Format of daily keys.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// The timezone in which hourly buckets and daily extremes are kept.
///
/// Readings are always timestamped in UTC; the zone only decides which
/// local hour and calendar date a reading falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The system's local timezone.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl Zone {
    /// A zone pinned to UTC.
    pub fn utc() -> Self {
        Zone::Fixed(Utc.fix())
    }

    /// Hourly bucket key for an instant, e.g. `2024-01-02 13:00`.
    pub fn hour_key(&self, at: DateTime<Utc>) -> String {
        self.format(at, HOUR_KEY_FORMAT)
    }

    /// Calendar date key for an instant, e.g. `2024-01-02`.
    pub fn date_key(&self, at: DateTime<Utc>) -> String {
        self.format(at, DATE_KEY_FORMAT)
    }

    /// Format an instant in this zone with a `strftime` pattern.
    pub fn format(&self, at: DateTime<Utc>, fmt: &str) -> String {
        match self {
            Zone::Local => at.with_timezone(&Local).format(fmt).to_string(),
            Zone::Fixed(offset) => at.with_timezone(offset).format(fmt).to_string(),
        }
    }
}

impl FromStr for Zone {
    type Err = ZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" | "" => Ok(Zone::Local),
            "utc" | "z" => Ok(Zone::utc()),
            _ => trimmed
                .parse::<FixedOffset>()
                .map(Zone::Fixed)
                .map_err(|_| ZoneParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}
