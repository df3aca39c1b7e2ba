//! The station store: the single point of mutation for all station state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::aggregate::{Observation, RecentEntry, StationAggregate};
use crate::config::{StoreBuilder, StoreConfig};
use crate::error::IngestError;
use crate::outage::{apply_transition, assess, compose_note, OutageEvent, OutageLog};
use crate::reading::RawReading;
use crate::validate::{parse_timestamp, validate_reading};
use crate::view::{Snapshot, StationView};

/// Concurrency-safe map from station id to its aggregate.
///
/// Ingestion and snapshots are serialized by one lock that covers every
/// aggregate and the outage log, so a snapshot is always consistent.
/// Share it between feeds and the reader through an `Arc`.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use serde_json::json;
/// use stationwatch_core::{StationStatus, StationStore};
///
/// let store = StationStore::builder().build();
/// let now = Utc::now();
///
/// store
///     .ingest("berlin-1", &json!(21.5), &json!(48), &json!("2024-01-02T12:00:00Z"), now)
///     .unwrap();
///
/// let snapshot = store.snapshot(now);
/// assert_eq!(snapshot.get("berlin-1").unwrap().status, StationStatus::Ok);
/// ```
#[derive(Debug)]
pub struct StationStore {
    config: StoreConfig,
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    stations: BTreeMap<String, StationAggregate>,
    outages: OutageLog,
}

impl StationStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Create a builder for configuring the store.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Declare a station that is expected to report.
    ///
    /// A registered station shows up as OFFLINE until its first reading.
    /// Registering an existing station is a no-op.
    pub fn register(&self, station_id: &str) -> Result<(), IngestError> {
        if let Err(err) = check_station_id(station_id) {
            warn!(error = %err, "ignoring station registration");
            return Err(err);
        }

        let mut inner = self.inner.lock();
        if !inner.stations.contains_key(station_id) {
            debug!(station_id, "station registered");
            inner.stations.insert(
                station_id.to_string(),
                StationAggregate::new(self.config.buffer_capacity),
            );
        }
        Ok(())
    }

    /// Record one reading received at `now`.
    ///
    /// Readings that fail validation are still recorded; only a missing
    /// station id causes the reading to be dropped.
    pub fn ingest(
        &self,
        station_id: &str,
        temperature: &Value,
        humidity: &Value,
        timestamp: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        if let Err(err) = check_station_id(station_id) {
            warn!(error = %err, "dropping reading");
            return Err(err);
        }

        let validation = validate_reading(temperature, humidity);
        let payload_timestamp = parse_timestamp(timestamp);
        if !validation.ok {
            debug!(station_id, errors = ?validation.errors, "reading failed validation");
        }

        let mut inner = self.inner.lock();
        let aggregate = inner
            .stations
            .entry(station_id.to_string())
            .or_insert_with(|| {
                info!(station_id, "first reading from new station");
                StationAggregate::new(self.config.buffer_capacity)
            });

        aggregate.observe(
            Observation {
                temperature,
                humidity,
                payload_timestamp,
                validation,
                received_at: now,
            },
            &self.config,
        );
        Ok(())
    }

    /// Record a decoded payload.
    ///
    /// A `stationId` that is not a JSON string is rejected.
    pub fn ingest_reading(&self, reading: &RawReading, now: DateTime<Utc>) -> Result<(), IngestError> {
        let station_id = match &reading.station_id {
            Value::String(id) => id.as_str(),
            Value::Null => "",
            other => {
                let err = IngestError::InvalidStationId(other.to_string());
                warn!(error = %err, "dropping reading");
                return Err(err);
            }
        };

        self.ingest(
            station_id,
            &reading.temperature,
            &reading.humidity,
            &reading.timestamp,
            now,
        )
    }

    /// Compute the status of every station at `now`.
    ///
    /// Outage transitions are applied here, so calling this twice with the
    /// same `now` reports each transition once.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let mut inner = self.inner.lock();
        let StoreInner { stations, outages } = &mut *inner;

        let mut views = Vec::with_capacity(stations.len());
        let mut transitions = Vec::new();

        for (station_id, aggregate) in stations.iter_mut() {
            let assessment = assess(aggregate, now, self.config.stale_after);
            if let Some(transition) =
                apply_transition(station_id, aggregate, assessment.status, outages, now)
            {
                transitions.push(transition);
            }

            let hourly_summaries = aggregate.recent_hourly_summaries(self.config.summary_hours);
            let hourly_lines: Vec<String> =
                hourly_summaries.iter().map(ToString::to_string).collect();
            let note = compose_note(&assessment, aggregate.daily(), &hourly_lines);

            views.push(StationView {
                station_id: station_id.clone(),
                status: assessment.status,
                reason: assessment.reason,
                note,
                last_temperature: aggregate.last_temperature().clone(),
                last_humidity: aggregate.last_humidity().clone(),
                last_payload_timestamp: aggregate.last_payload_timestamp(),
                last_received_at: aggregate.last_received_at(),
                last_valid: aggregate.last_valid(),
                last_errors: aggregate.last_errors().to_vec(),
                outage_active: aggregate.outage_active(),
                average: aggregate.average_over(self.config.average_window, now),
                hourly: aggregate.hourly().clone(),
                hourly_summaries,
                daily: aggregate.daily().cloned(),
                recent_len: aggregate.recent().len(),
                readings_total: aggregate.readings_total(),
            });
        }

        Snapshot {
            taken_at: now,
            stations: views,
            transitions,
        }
    }

    /// A copy of the outage log, oldest first.
    pub fn outages(&self) -> Vec<OutageEvent> {
        self.inner.lock().outages.events().to_vec()
    }

    /// A copy of one station's recent-reading buffer, oldest first.
    pub fn recent(&self, station_id: &str) -> Option<Vec<RecentEntry>> {
        self.inner
            .lock()
            .stations
            .get(station_id)
            .map(|aggregate| aggregate.recent().iter().copied().collect())
    }

    pub fn station_count(&self) -> usize {
        self.inner.lock().stations.len()
    }

    /// Known station ids, sorted.
    pub fn station_ids(&self) -> Vec<String> {
        self.inner.lock().stations.keys().cloned().collect()
    }
}

impl Default for StationStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn check_station_id(station_id: &str) -> Result<(), IngestError> {
    if station_id.trim().is_empty() {
        Err(IngestError::MissingStationId)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outage::{OutageTransition, StationStatus};
    use crate::zone::Zone;
    use chrono::{TimeDelta, TimeZone};
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
    }

    fn utc_store() -> StationStore {
        StationStore::builder().zone(Zone::utc()).build()
    }

    fn ingest(store: &StationStore, id: &str, t: Value, h: Value, at: DateTime<Utc>) {
        store
            .ingest(id, &t, &h, &json!("2024-01-02T12:00:00Z"), at)
            .unwrap();
    }

    #[test]
    fn test_ingest_creates_station() {
        let store = utc_store();
        ingest(&store, "s1", json!(20.5), json!(40), t0());

        assert_eq!(store.station_count(), 1);
        let snapshot = store.snapshot(t0());
        let view = snapshot.get("s1").unwrap();
        assert_eq!(view.status, StationStatus::Ok);
        assert_eq!(view.last_temperature, json!(20.5));
        assert_eq!(view.last_received_at, Some(t0()));
        assert_eq!(
            view.last_payload_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap())
        );
        assert_eq!(view.readings_total, 1);
        assert!(snapshot.transitions.is_empty());
    }

    #[test]
    fn test_empty_station_id_is_dropped() {
        let store = utc_store();
        let result = store.ingest("   ", &json!(20), &json!(50), &Value::Null, t0());
        assert_eq!(result, Err(IngestError::MissingStationId));
        assert_eq!(store.station_count(), 0);
    }

    #[test]
    fn test_non_string_station_id_is_dropped() {
        let store = utc_store();
        let reading = RawReading::from_json(r#"{"stationId":42,"temperature":20}"#).unwrap();
        assert_eq!(
            store.ingest_reading(&reading, t0()),
            Err(IngestError::InvalidStationId("42".to_string()))
        );

        let missing = RawReading::from_json(r#"{"temperature":20}"#).unwrap();
        assert_eq!(
            store.ingest_reading(&missing, t0()),
            Err(IngestError::MissingStationId)
        );
        assert_eq!(store.station_count(), 0);
    }

    #[test]
    fn test_ingest_reading_unpacks_payload() {
        let store = utc_store();
        let reading = RawReading::new("s1", "21.0", "55", "garbage");
        store.ingest_reading(&reading, t0()).unwrap();

        let snapshot = store.snapshot(t0());
        let view = snapshot.get("s1").unwrap();
        assert_eq!(view.last_temperature, json!("21.0"));
        assert_eq!(view.last_payload_timestamp, None);
        assert!(view.last_valid);
    }

    #[test]
    fn test_invalid_reading_is_recorded() {
        let store = utc_store();
        ingest(&store, "s1", json!("-999"), json!("150"), t0());

        let snapshot = store.snapshot(t0());
        let view = snapshot.get("s1").unwrap();
        assert_eq!(view.status, StationStatus::Invalid);
        assert!(!view.last_valid);
        assert_eq!(view.last_errors.len(), 2);
        assert!(view.note.starts_with("invalid temperature -999.0; invalid humidity 150.0"));
        // invalid values still aggregate
        assert_eq!(view.hourly["2024-01-02 12:00"].count, 1);
        assert!(!view.outage_active);
    }

    #[test]
    fn test_non_numeric_fields_count_but_do_not_sum() {
        let store = utc_store();
        ingest(&store, "s1", json!("warm"), json!(50), t0());

        let snapshot = store.snapshot(t0());
        let bucket = &snapshot.get("s1").unwrap().hourly["2024-01-02 12:00"];
        assert_eq!(bucket.count, 1);
        assert_eq!(bucket.temperature_sum, 0.0);
        assert_eq!(bucket.temperature_min, None);
        assert_eq!(bucket.humidity_sum, 50.0);
    }

    #[test]
    fn test_identical_readings_accumulate_in_one_hour() {
        let store = utc_store();
        for i in 0..5 {
            ingest(&store, "s1", json!(20), json!(50), t0() + TimeDelta::seconds(i));
        }

        let snapshot = store.snapshot(t0() + TimeDelta::seconds(5));
        let view = snapshot.get("s1").unwrap();
        let bucket = &view.hourly["2024-01-02 12:00"];
        assert_eq!(bucket.count, 5);
        assert_eq!(bucket.temperature_sum, 100.0);
        assert_eq!(bucket.humidity_sum, 250.0);
        assert_eq!(view.hourly_summaries.len(), 1);
        assert_eq!(view.hourly_summaries[0].temperature_mean, Some(20.0));
    }

    #[test]
    fn test_buffer_keeps_most_recent_entries() {
        let store = utc_store();
        for i in 0..2500 {
            ingest(&store, "s1", json!(i), json!(50), t0() + TimeDelta::milliseconds(i));
        }

        let recent = store.recent("s1").unwrap();
        assert_eq!(recent.len(), 2000);
        assert_eq!(recent[0].at, t0() + TimeDelta::milliseconds(500));
        assert_eq!(recent[1999].at, t0() + TimeDelta::milliseconds(2499));
        assert!(store.recent("nope").is_none());
    }

    #[test]
    fn test_rolling_average_window() {
        let store = utc_store();
        ingest(&store, "s1", json!(0), json!(0), t0() - TimeDelta::minutes(10));
        ingest(&store, "s1", json!(10), json!(40), t0() - TimeDelta::minutes(1));
        ingest(&store, "s1", json!(20), json!(60), t0());

        let snapshot = store.snapshot(t0());
        let average = snapshot.get("s1").unwrap().average;
        assert_eq!(average.temperature, Some(15.0));
        assert_eq!(average.humidity, Some(50.0));
    }

    #[test]
    fn test_daily_extremes_reset_on_date_change() {
        let store = utc_store();
        let late = Utc.with_ymd_and_hms(2024, 1, 2, 23, 30, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 1, 3, 0, 30, 0).unwrap();
        ingest(&store, "s1", json!(10), json!(80), late);
        ingest(&store, "s1", json!(5), json!(60), early);

        let snapshot = store.snapshot(early);
        let daily = snapshot.get("s1").unwrap().daily.clone().unwrap();
        assert_eq!(daily.date, "2024-01-03");
        assert_eq!(daily.temperature_min, Some(5.0));
        assert_eq!(daily.temperature_max, Some(5.0));
        assert_eq!(daily.humidity_max, Some(60.0));
    }

    #[test]
    fn test_hourly_retention() {
        let store = StationStore::builder()
            .zone(Zone::utc())
            .hourly_retention(2)
            .build();
        for hour in 0..4 {
            ingest(&store, "s1", json!(20), json!(50), t0() + TimeDelta::hours(hour));
        }

        let snapshot = store.snapshot(t0() + TimeDelta::hours(3));
        let keys: Vec<_> = snapshot.get("s1").unwrap().hourly.keys().cloned().collect();
        assert_eq!(keys, vec!["2024-01-02 14:00", "2024-01-02 15:00"]);
    }

    #[test]
    fn test_stale_outage_opens_and_closes_once() {
        let store = utc_store();
        ingest(&store, "s1", json!(20), json!(50), t0());

        let fresh = store.snapshot(t0() + TimeDelta::seconds(10));
        assert_eq!(fresh.get("s1").unwrap().status, StationStatus::Ok);
        assert!(store.outages().is_empty());

        let stale_at = t0() + TimeDelta::seconds(31);
        let stale = store.snapshot(stale_at);
        let view = stale.get("s1").unwrap();
        assert_eq!(view.status, StationStatus::Stale);
        assert!(view.outage_active);
        assert!(view.note.starts_with(">30s no update"));
        assert_eq!(
            stale.transitions,
            vec![OutageTransition::Started {
                station_id: "s1".to_string(),
                at: stale_at,
            }]
        );
        assert!(stale.has_new_outage());

        let again = store.snapshot(t0() + TimeDelta::seconds(40));
        assert!(again.transitions.is_empty());
        assert_eq!(store.outages().len(), 1);

        let back = t0() + TimeDelta::seconds(50);
        ingest(&store, "s1", json!(21), json!(50), back);
        let recovered = store.snapshot(back);
        assert_eq!(recovered.get("s1").unwrap().status, StationStatus::Ok);
        assert!(!recovered.get("s1").unwrap().outage_active);
        assert_eq!(recovered.transitions.len(), 1);
        assert!(!recovered.transitions[0].is_start());

        let outages = store.outages();
        assert_eq!(outages.len(), 1);
        assert_eq!(outages[0].start, stale_at);
        assert_eq!(outages[0].end, Some(back));

        let quiet = store.snapshot(back);
        assert!(quiet.transitions.is_empty());
    }

    #[test]
    fn test_invalid_reading_ends_outage() {
        let store = utc_store();
        ingest(&store, "s1", json!(20), json!(50), t0());
        store.snapshot(t0() + TimeDelta::minutes(1));

        let back = t0() + TimeDelta::minutes(2);
        ingest(&store, "s1", json!(-999), json!(50), back);
        let snapshot = store.snapshot(back);
        assert_eq!(snapshot.get("s1").unwrap().status, StationStatus::Invalid);
        assert_eq!(store.outages()[0].end, Some(back));
    }

    #[test]
    fn test_custom_stale_threshold() {
        let store = StationStore::builder()
            .stale_after(Duration::from_secs(5))
            .zone(Zone::utc())
            .build();
        ingest(&store, "s1", json!(20), json!(50), t0());

        let snapshot = store.snapshot(t0() + TimeDelta::seconds(6));
        assert_eq!(snapshot.get("s1").unwrap().reason, ">5s no update");
    }

    #[test]
    fn test_registered_station_is_offline() {
        let store = StationStore::builder()
            .zone(Zone::utc())
            .stations(["s9", "s1"])
            .build();
        assert_eq!(store.station_ids(), vec!["s1", "s9"]);
        assert_eq!(store.register(""), Err(IngestError::MissingStationId));
        store.register("s9").unwrap();
        assert_eq!(store.station_count(), 2);

        let snapshot = store.snapshot(t0());
        let view = snapshot.get("s9").unwrap();
        assert_eq!(view.status, StationStatus::Offline);
        assert_eq!(view.note, "no data received yet");
        assert!(view.hourly.is_empty());
        assert!(view.daily.is_none());
        assert_eq!(view.recent_len, 0);
        assert_eq!(view.average.temperature_label(), "n/a");
        assert!(view.outage_active);
        assert_eq!(snapshot.transitions.len(), 2);
        assert_eq!(store.outages().len(), 2);
    }

    #[test]
    fn test_builder_skips_blank_station_ids() {
        let store = StationStore::builder()
            .zone(Zone::utc())
            .stations(["", "roof", "  "])
            .build();
        assert_eq!(store.station_ids(), vec!["roof"]);
        assert_eq!(store.register("  "), Err(IngestError::MissingStationId));
        assert_eq!(store.station_count(), 1);
    }

    #[test]
    fn test_snapshot_sorted_and_counted() {
        let store = utc_store();
        ingest(&store, "zeta", json!(20), json!(50), t0());
        ingest(&store, "alpha", json!(-999), json!(50), t0());
        store.register("mid").unwrap();

        let snapshot = store.snapshot(t0());
        let ids: Vec<_> = snapshot.iter().map(|v| v.station_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);

        let counts = snapshot.count_by_status();
        assert_eq!(counts.get(&StationStatus::Ok), Some(&1));
        assert_eq!(counts.get(&StationStatus::Invalid), Some(&1));
        assert_eq!(counts.get(&StationStatus::Offline), Some(&1));
        assert_eq!(counts.get(&StationStatus::Stale), None);
    }

    #[test]
    fn test_note_includes_daily_and_hourly() {
        let store = utc_store();
        ingest(&store, "s1", json!(20), json!(50), t0());

        let snapshot = store.snapshot(t0());
        assert_eq!(
            snapshot.get("s1").unwrap().note,
            "- | 2024-01-02 Tmin/Tmax: 20.0 °C / 20.0 °C, Hmin/Hmax: 50.0 % / 50.0 % \
             | H: 12: 1 / 20.0C / 50.0%"
        );
    }

    #[test]
    fn test_late_ingestion_keeps_station_fresh() {
        let store = utc_store();
        ingest(&store, "s1", json!(20), json!(50), t0());
        ingest(&store, "s1", json!(22), json!(54), t0() - TimeDelta::minutes(10));

        let times: Vec<_> = store.recent("s1").unwrap().iter().map(|e| e.at).collect();
        assert_eq!(times, vec![t0(), t0()]);

        let snapshot = store.snapshot(t0());
        let view = snapshot.get("s1").unwrap();
        assert_eq!(view.status, StationStatus::Ok);
        assert_eq!(view.last_received_at, Some(t0()));
        assert_eq!(view.last_temperature, json!(22));
        assert_eq!(view.average.temperature, Some(21.0));
        assert_eq!(view.average.humidity, Some(52.0));
        assert!(snapshot.transitions.is_empty());
        assert!(store.outages().is_empty());
    }

    #[test]
    fn test_interleaved_instants_keep_buffer_ordered() {
        let store = utc_store();
        let offsets = [0, 30, 10, 45, 20, 60, 5, 59];
        for (i, secs) in offsets.iter().enumerate() {
            ingest(&store, "s1", json!(i), json!(50), t0() + TimeDelta::seconds(*secs));
        }

        let recent = store.recent("s1").unwrap();
        assert_eq!(recent.len(), offsets.len());
        assert!(recent.windows(2).all(|pair| pair[0].at <= pair[1].at));
        assert_eq!(recent.last().unwrap().at, t0() + TimeDelta::seconds(60));

        let snapshot = store.snapshot(t0() + TimeDelta::seconds(80));
        let view = snapshot.get("s1").unwrap();
        assert_eq!(view.last_received_at, Some(t0() + TimeDelta::seconds(60)));
        assert_eq!(view.status, StationStatus::Ok);
        assert!(!view.outage_active);
    }

    #[test]
    fn concurrent_ingestion_is_thread_safe() {
        let store = Arc::new(utc_store());
        let mut handles = vec![];

        for worker in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    let id = if i % 2 == 0 { "shared".to_string() } else { format!("w{}", worker) };
                    store
                        .ingest(&id, &json!(20), &json!(50), &Value::Null, t0())
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot(t0());
        assert_eq!(snapshot.len(), 9);
        assert_eq!(snapshot.get("shared").unwrap().readings_total, 8 * 125);
        assert_eq!(snapshot.get("w3").unwrap().readings_total, 125);
        assert_eq!(snapshot.get("shared").unwrap().hourly["2024-01-02 12:00"].count, 1000);
    }
}
