//! Decoded reading payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reading as published by a station, after JSON decoding.
///
/// Fields stay as raw JSON values: validation decides what is a number and
/// what is not, and a missing field decodes as `null`.
///
/// ```
/// use stationwatch_core::RawReading;
///
/// let reading = RawReading::from_slice(
///     br#"{"stationId":"berlin-1","temperature":21.5,"humidity":"48","timestamp":"2024-01-02T12:00:00Z"}"#,
/// ).unwrap();
/// assert_eq!(reading.station_id(), Some("berlin-1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(rename = "stationId", default)]
    pub station_id: Value,
    #[serde(default)]
    pub temperature: Value,
    #[serde(default)]
    pub humidity: Value,
    #[serde(default)]
    pub timestamp: Value,
}

impl RawReading {
    /// Build a reading from already-typed values.
    pub fn new(
        station_id: impl Into<String>,
        temperature: impl Into<Value>,
        humidity: impl Into<Value>,
        timestamp: impl Into<Value>,
    ) -> Self {
        Self {
            station_id: Value::String(station_id.into()),
            temperature: temperature.into(),
            humidity: humidity.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Decode a JSON object payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Decode a JSON object payload from text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The station identifier, if it is a string.
    pub fn station_id(&self) -> Option<&str> {
        self.station_id.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_decode_as_null() {
        let reading = RawReading::from_json(r#"{"stationId":"a"}"#).unwrap();
        assert_eq!(reading.station_id(), Some("a"));
        assert!(reading.temperature.is_null());
        assert!(reading.humidity.is_null());
        assert!(reading.timestamp.is_null());
    }

    #[test]
    fn numeric_station_id_is_not_a_string() {
        let reading = RawReading::from_json(r#"{"stationId":42,"temperature":1}"#).unwrap();
        assert_eq!(reading.station_id(), None);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(RawReading::from_json("\"hello\"").is_err());
        assert!(RawReading::from_json("17").is_err());
        assert!(RawReading::from_slice(b"not json").is_err());
    }

    #[test]
    fn serializes_with_wire_names() {
        let reading = RawReading::new("s1", 20.5, 40, "2024-01-02T12:00:00Z");
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["stationId"], "s1");
        assert_eq!(json["humidity"], 40);
    }
}
