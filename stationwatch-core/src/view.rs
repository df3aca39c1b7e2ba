//! Read-only views produced by [`StationStore::snapshot`](crate::StationStore::snapshot).

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{DailyExtremes, HourlyBucket, HourlySummary, RollingAverage};
use crate::outage::{OutageTransition, StationStatus};

/// Everything known about one station at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationView {
    pub station_id: String,
    pub status: StationStatus,
    /// Reason for the status, without the daily or hourly parts.
    pub reason: String,
    /// Reason plus daily extremes and hourly lines.
    pub note: String,
    pub last_temperature: Value,
    pub last_humidity: Value,
    pub last_payload_timestamp: Option<DateTime<Utc>>,
    pub last_received_at: Option<DateTime<Utc>>,
    pub last_valid: bool,
    pub last_errors: Vec<String>,
    pub outage_active: bool,
    /// Rolling average over the configured window.
    pub average: RollingAverage,
    pub hourly: BTreeMap<String, HourlyBucket>,
    pub hourly_summaries: Vec<HourlySummary>,
    pub daily: Option<DailyExtremes>,
    /// Entries currently held in the recent-reading buffer.
    pub recent_len: usize,
    pub readings_total: u64,
}

impl StationView {
    /// Time since the last reading, if any was received.
    pub fn age(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.last_received_at.map(|at| now.signed_duration_since(at))
    }

    /// The last temperature as received, for display.
    pub fn temperature_raw(&self) -> String {
        format_raw(&self.last_temperature)
    }

    /// The last humidity as received, for display.
    pub fn humidity_raw(&self) -> String {
        format_raw(&self.last_humidity)
    }
}

/// A point-in-time view of every station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    /// Stations sorted by id.
    pub stations: Vec<StationView>,
    /// Outage transitions applied while taking this snapshot.
    pub transitions: Vec<OutageTransition>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, station_id: &str) -> Option<&StationView> {
        self.stations
            .binary_search_by(|v| v.station_id.as_str().cmp(station_id))
            .ok()
            .map(|i| &self.stations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationView> {
        self.stations.iter()
    }

    /// Number of stations per status.
    pub fn count_by_status(&self) -> BTreeMap<StationStatus, usize> {
        let mut counts = BTreeMap::new();
        for view in &self.stations {
            *counts.entry(view.status).or_insert(0) += 1;
        }
        counts
    }

    /// True if any station went into outage during this snapshot.
    pub fn has_new_outage(&self) -> bool {
        self.transitions.iter().any(OutageTransition::is_start)
    }
}

/// Render a raw value the way it was sent; `-` when absent.
pub fn format_raw(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
