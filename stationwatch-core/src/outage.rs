//! Station status derivation and outage tracking.
//!
//! Status is recomputed from scratch at every snapshot from the station's
//! last receive time and last validation outcome. Outage events are opened
//! and closed by comparing that status against the station's stored
//! `outage_active` flag, which makes repeated snapshots idempotent.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{DailyExtremes, StationAggregate};

/// Status of a station at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StationStatus {
    /// Fresh and valid.
    Ok,
    /// Fresh, but the last reading failed validation.
    Invalid,
    /// Data was received once but is older than the staleness threshold.
    Stale,
    /// No data received yet.
    Offline,
}

impl StationStatus {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            StationStatus::Ok => "OK",
            StationStatus::Invalid => "INVALID",
            StationStatus::Stale => "STALE",
            StationStatus::Offline => "OFFLINE",
        }
    }

    /// STALE and OFFLINE both count as an outage.
    pub fn is_outage(&self) -> bool {
        matches!(self, StationStatus::Stale | StationStatus::Offline)
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A derived status together with the human-readable reason for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAssessment {
    pub status: StationStatus,
    pub reason: String,
}

/// Derive a station's status at `now`.
///
/// A station is stale once the age of its last reading strictly exceeds
/// `stale_after`. Readings timestamped after `now` count as fresh.
pub fn assess(
    aggregate: &StationAggregate,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> StatusAssessment {
    let Some(last) = aggregate.last_received_at() else {
        return StatusAssessment {
            status: StationStatus::Offline,
            reason: "no data received yet".to_string(),
        };
    };

    let threshold = TimeDelta::from_std(stale_after).unwrap_or(TimeDelta::MAX);
    if now.signed_duration_since(last) > threshold {
        return StatusAssessment {
            status: StationStatus::Stale,
            reason: format!(">{}s no update", threshold_secs(stale_after)),
        };
    }

    if !aggregate.last_valid() {
        let reason = if aggregate.last_errors().is_empty() {
            "invalid data".to_string()
        } else {
            aggregate.last_errors().join("; ")
        };
        return StatusAssessment {
            status: StationStatus::Invalid,
            reason,
        };
    }

    StatusAssessment {
        status: StationStatus::Ok,
        reason: "all good".to_string(),
    }
}

/// Whole seconds print without a fraction; sub-second parts are kept.
fn threshold_secs(threshold: Duration) -> String {
    if threshold.subsec_nanos() == 0 {
        threshold.as_secs().to_string()
    } else {
        format!("{}", threshold.as_secs_f64())
    }
}

/// One outage interval. `end` stays `None` while the outage is ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutageEvent {
    pub station_id: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl OutageEvent {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Length of the outage, measured up to `now` while still open.
    pub fn duration(&self, now: DateTime<Utc>) -> TimeDelta {
        self.end.unwrap_or(now).signed_duration_since(self.start)
    }
}

/// A change in outage state detected by a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutageTransition {
    Started {
        station_id: String,
        at: DateTime<Utc>,
    },
    Ended {
        station_id: String,
        at: DateTime<Utc>,
        duration_secs: f64,
    },
}

impl OutageTransition {
    pub fn station_id(&self) -> &str {
        match self {
            OutageTransition::Started { station_id, .. }
            | OutageTransition::Ended { station_id, .. } => station_id,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            OutageTransition::Started { at, .. } | OutageTransition::Ended { at, .. } => *at,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, OutageTransition::Started { .. })
    }
}

impl fmt::Display for OutageTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutageTransition::Started { station_id, at } => {
                write!(f, "{} outage START at {}", station_id, at.to_rfc3339())
            }
            OutageTransition::Ended {
                station_id,
                at,
                duration_secs,
            } => write!(
                f,
                "{} outage END at {} (duration {:.1}s)",
                station_id,
                at.to_rfc3339(),
                duration_secs
            ),
        }
    }
}

/// Append-only log of outage events, oldest first.
#[derive(Debug, Clone, Default)]
pub struct OutageLog {
    events: Vec<OutageEvent>,
}

impl OutageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new event for `station_id` starting at `at`.
    pub fn open(&mut self, station_id: &str, at: DateTime<Utc>) -> OutageTransition {
        self.events.push(OutageEvent {
            station_id: station_id.to_string(),
            start: at,
            end: None,
        });
        OutageTransition::Started {
            station_id: station_id.to_string(),
            at,
        }
    }

    /// Close the most recent open event for `station_id`.
    ///
    /// Returns `None` if the station has no open event.
    pub fn close(&mut self, station_id: &str, at: DateTime<Utc>) -> Option<OutageTransition> {
        let event = self
            .events
            .iter_mut()
            .rev()
            .find(|e| e.station_id == station_id && e.is_open())?;
        event.end = Some(at);

        Some(OutageTransition::Ended {
            station_id: station_id.to_string(),
            at,
            duration_secs: event.duration(at).num_milliseconds() as f64 / 1000.0,
        })
    }

    /// The currently open event for a station, if any.
    pub fn open_event(&self, station_id: &str) -> Option<&OutageEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| e.station_id == station_id && e.is_open())
    }

    pub fn events(&self) -> &[OutageEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Apply the outage side effects of `status` to a station.
///
/// Opens an event when the station enters STALE/OFFLINE and closes it when
/// it returns to OK/INVALID. Any other combination is a no-op.
pub fn apply_transition(
    station_id: &str,
    aggregate: &mut StationAggregate,
    status: StationStatus,
    log: &mut OutageLog,
    now: DateTime<Utc>,
) -> Option<OutageTransition> {
    match (status.is_outage(), aggregate.outage_active) {
        (true, false) => {
            aggregate.outage_active = true;
            warn!(station_id, status = %status, start = %now, "station outage started");
            Some(log.open(station_id, now))
        }
        (false, true) => {
            aggregate.outage_active = false;
            let transition = log.close(station_id, now);
            if let Some(OutageTransition::Ended { duration_secs, .. }) = &transition {
                info!(station_id, end = %now, duration_secs, "station outage ended");
            }
            transition
        }
        _ => None,
    }
}

/// Compose the free-text note shown next to a station.
///
/// The status reason comes first (`-` when all is good and more follows),
/// then the day's extremes, then the recent hourly lines.
pub fn compose_note(
    assessment: &StatusAssessment,
    daily: Option<&DailyExtremes>,
    hourly_lines: &[String],
) -> String {
    let mut note = assessment.reason.clone();

    if let Some(daily) = daily {
        let base = if assessment.status == StationStatus::Ok {
            "-"
        } else {
            note.as_str()
        };
        note = format!("{} | {}", base, daily)
            .trim_start_matches([' ', '|'])
            .to_string();
    }

    if !hourly_lines.is_empty() {
        note = format!("{} | H: {}", note, hourly_lines.join(" ; "))
            .trim()
            .to_string();
    }

    note
}
