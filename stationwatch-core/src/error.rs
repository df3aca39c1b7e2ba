//! Error types for the station store.

use thiserror::Error;

/// Reasons a reading is dropped before it reaches a station aggregate.
///
/// Data-quality problems (non-numeric values, out-of-range values, bad
/// timestamps) are never errors; they are recorded on the station instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The station identifier was empty or only whitespace.
    #[error("missing or empty station id")]
    MissingStationId,

    /// The station identifier was present but not a string.
    #[error("station id is not a string: {0}")]
    InvalidStationId(String),
}

/// Failed to parse a timezone setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timezone `{0}`: expected `local`, `utc` or an offset like `+02:00`")]
pub struct ZoneParseError(pub String);
