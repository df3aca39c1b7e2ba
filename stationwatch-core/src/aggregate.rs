//! Per-station aggregate state.
//!
//! A [`StationAggregate`] holds everything known about one station: the most
//! recent raw reading and its validation outcome, a bounded buffer of recent
//! values for rolling averages, hourly buckets, and the current day's
//! extremes. Aggregates are owned by the [`StationStore`](crate::StationStore)
//! and only ever mutated under its lock.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::validate::{parse_number, Validation};

/// One entry of the recent-reading buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecentEntry {
    pub at: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Accumulator for all readings received within one local hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub count: u64,
    pub temperature_sum: f64,
    pub humidity_sum: f64,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
}

impl HourlyBucket {
    /// Count a reading and fold in whichever fields are present.
    pub fn record(&mut self, temperature: Option<f64>, humidity: Option<f64>) {
        self.count += 1;
        if let Some(t) = temperature {
            self.temperature_sum += t;
            widen(&mut self.temperature_min, &mut self.temperature_max, t);
        }
        if let Some(h) = humidity {
            self.humidity_sum += h;
            widen(&mut self.humidity_min, &mut self.humidity_max, h);
        }
    }

    /// Mean temperature over all readings in the hour, if any temperature was summed.
    pub fn temperature_mean(&self) -> Option<f64> {
        mean(self.temperature_sum, self.count)
    }

    /// Mean humidity over all readings in the hour, if any humidity was summed.
    pub fn humidity_mean(&self) -> Option<f64> {
        mean(self.humidity_sum, self.count)
    }
}

/// Minimum and maximum values for the current local day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExtremes {
    pub date: String,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
}

impl DailyExtremes {
    /// An empty record for `date`.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            temperature_min: None,
            temperature_max: None,
            humidity_min: None,
            humidity_max: None,
        }
    }

    /// Fold in whichever fields are present.
    pub fn record(&mut self, temperature: Option<f64>, humidity: Option<f64>) {
        if let Some(t) = temperature {
            widen(&mut self.temperature_min, &mut self.temperature_max, t);
        }
        if let Some(h) = humidity {
            widen(&mut self.humidity_min, &mut self.humidity_max, h);
        }
    }
}

impl fmt::Display for DailyExtremes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Tmin/Tmax: {} / {}, Hmin/Hmax: {} / {}",
            self.date,
            format_measure(self.temperature_min, "°C"),
            format_measure(self.temperature_max, "°C"),
            format_measure(self.humidity_min, "%"),
            format_measure(self.humidity_max, "%"),
        )
    }
}

/// Rolling averages over a time window. `None` means no contributing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RollingAverage {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl RollingAverage {
    /// Temperature with one decimal, or `n/a`.
    pub fn temperature_label(&self) -> String {
        format_measure(self.temperature, "")
    }

    /// Humidity with one decimal, or `n/a`.
    pub fn humidity_label(&self) -> String {
        format_measure(self.humidity, "")
    }
}

/// Condensed view of one hourly bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySummary {
    /// Full bucket key, `YYYY-MM-DD HH:00`.
    pub hour: String,
    pub count: u64,
    pub temperature_mean: Option<f64>,
    pub humidity_mean: Option<f64>,
}

impl HourlySummary {
    /// The two-digit hour of the key.
    pub fn label(&self) -> &str {
        self.hour.get(11..13).unwrap_or(&self.hour)
    }
}

impl fmt::Display for HourlySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let temperature = self
            .temperature_mean
            .map(|t| format!("{:.1}C", t))
            .unwrap_or_else(|| "n/a".to_string());
        let humidity = self
            .humidity_mean
            .map(|h| format!("{:.1}%", h))
            .unwrap_or_else(|| "n/a".to_string());
        write!(f, "{}: {} / {} / {}", self.label(), self.count, temperature, humidity)
    }
}

/// A validated reading ready to be folded into an aggregate.
#[derive(Debug, Clone)]
pub struct Observation<'a> {
    pub temperature: &'a Value,
    pub humidity: &'a Value,
    pub payload_timestamp: Option<DateTime<Utc>>,
    pub validation: Validation,
    pub received_at: DateTime<Utc>,
}

/// All state kept for one station.
#[derive(Debug, Clone)]
pub struct StationAggregate {
    pub(crate) last_temperature: Value,
    pub(crate) last_humidity: Value,
    pub(crate) last_payload_timestamp: Option<DateTime<Utc>>,
    pub(crate) last_received_at: Option<DateTime<Utc>>,
    pub(crate) last_valid: bool,
    pub(crate) last_errors: Vec<String>,
    pub(crate) outage_active: bool,
    pub(crate) readings_total: u64,
    recent: VecDeque<RecentEntry>,
    capacity: usize,
    hourly: BTreeMap<String, HourlyBucket>,
    daily: Option<DailyExtremes>,
}

impl StationAggregate {
    /// An aggregate that has not seen any reading yet.
    pub fn new(capacity: usize) -> Self {
        Self {
            last_temperature: Value::Null,
            last_humidity: Value::Null,
            last_payload_timestamp: None,
            last_received_at: None,
            last_valid: false,
            last_errors: Vec::new(),
            outage_active: false,
            readings_total: 0,
            recent: VecDeque::new(),
            capacity,
            hourly: BTreeMap::new(),
            daily: None,
        }
    }

    /// Record a reading: latest values first, then rolling, hourly and daily state.
    ///
    /// A reading that arrives with an earlier instant than the last one is
    /// recorded at the last instant, so `received_at` never goes backwards.
    pub fn observe(&mut self, obs: Observation<'_>, config: &StoreConfig) {
        let received_at = match self.last_received_at {
            Some(last) if last > obs.received_at => last,
            _ => obs.received_at,
        };

        self.last_temperature = obs.temperature.clone();
        self.last_humidity = obs.humidity.clone();
        self.last_payload_timestamp = obs.payload_timestamp;
        self.last_received_at = Some(received_at);
        self.last_valid = obs.validation.ok;
        self.last_errors = obs.validation.errors;
        self.readings_total += 1;

        let temperature = parse_number(obs.temperature);
        let humidity = parse_number(obs.humidity);

        self.push_recent(RecentEntry {
            at: received_at,
            temperature,
            humidity,
        });
        self.update_hourly(
            config.zone.hour_key(received_at),
            temperature,
            humidity,
            config.hourly_retention,
        );
        self.update_daily(config.zone.date_key(received_at), temperature, humidity);
    }

    /// Append to the recent buffer, evicting the oldest entry when full.
    pub fn push_recent(&mut self, entry: RecentEntry) {
        self.recent.push_back(entry);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    /// Fold a reading into the bucket for `hour_key`.
    ///
    /// With `retention` set, only that many of the most recent hours are kept.
    pub fn update_hourly(
        &mut self,
        hour_key: String,
        temperature: Option<f64>,
        humidity: Option<f64>,
        retention: Option<usize>,
    ) {
        self.hourly.entry(hour_key).or_default().record(temperature, humidity);

        if let Some(keep) = retention {
            let keep = keep.max(1);
            while self.hourly.len() > keep {
                self.hourly.pop_first();
            }
        }
    }

    /// Fold a reading into the daily extremes, starting over when the date changes.
    pub fn update_daily(&mut self, date_key: String, temperature: Option<f64>, humidity: Option<f64>) {
        if self.daily.as_ref().map_or(true, |daily| daily.date != date_key) {
            self.daily = Some(DailyExtremes::new(date_key));
        }
        if let Some(daily) = self.daily.as_mut() {
            daily.record(temperature, humidity);
        }
    }

    /// Average the buffer entries received within `window` before `now`.
    ///
    /// Scanning stops at the first entry older than the cutoff.
    pub fn average_over(&self, window: Duration, now: DateTime<Utc>) -> RollingAverage {
        let cutoff = TimeDelta::from_std(window)
            .ok()
            .and_then(|w| now.checked_sub_signed(w))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut temperature = Accumulator::default();
        let mut humidity = Accumulator::default();

        for entry in self.recent.iter().rev() {
            if entry.at < cutoff {
                break;
            }
            if let Some(t) = entry.temperature {
                temperature.add(t);
            }
            if let Some(h) = entry.humidity {
                humidity.add(h);
            }
        }

        RollingAverage {
            temperature: temperature.mean(),
            humidity: humidity.mean(),
        }
    }

    /// Average over the last `minutes` minutes.
    pub fn average_last_minutes(&self, minutes: u64, now: DateTime<Utc>) -> RollingAverage {
        self.average_over(Duration::from_secs(minutes.saturating_mul(60)), now)
    }

    /// Summaries of up to `last_hours` most recent hourly buckets, oldest first.
    pub fn recent_hourly_summaries(&self, last_hours: usize) -> Vec<HourlySummary> {
        let mut summaries: Vec<HourlySummary> = self
            .hourly
            .iter()
            .rev()
            .take(last_hours)
            .map(|(hour, bucket)| HourlySummary {
                hour: hour.clone(),
                count: bucket.count,
                temperature_mean: bucket.temperature_mean(),
                humidity_mean: bucket.humidity_mean(),
            })
            .collect();
        summaries.reverse();
        summaries
    }

    /// Hourly summaries rendered one line per hour.
    pub fn recent_hourly_lines(&self, last_hours: usize) -> Vec<String> {
        self.recent_hourly_summaries(last_hours)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn last_temperature(&self) -> &Value {
        &self.last_temperature
    }

    pub fn last_humidity(&self) -> &Value {
        &self.last_humidity
    }

    pub fn last_payload_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_payload_timestamp
    }

    pub fn last_received_at(&self) -> Option<DateTime<Utc>> {
        self.last_received_at
    }

    pub fn last_valid(&self) -> bool {
        self.last_valid
    }

    pub fn last_errors(&self) -> &[String] {
        &self.last_errors
    }

    pub fn outage_active(&self) -> bool {
        self.outage_active
    }

    pub fn readings_total(&self) -> u64 {
        self.readings_total
    }

    pub fn recent(&self) -> &VecDeque<RecentEntry> {
        &self.recent
    }

    pub fn hourly(&self) -> &BTreeMap<String, HourlyBucket> {
        &self.hourly
    }

    pub fn daily(&self) -> Option<&DailyExtremes> {
        self.daily.as_ref()
    }
}

/// Format a value with one decimal and an optional unit, or `n/a`.
pub fn format_measure(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => format!("{:.1}", v),
        Some(v) => format!("{:.1} {}", v, unit),
        None => "n/a".to_string(),
    }
}

fn widen(min: &mut Option<f64>, max: &mut Option<f64>, value: f64) {
    *min = Some(min.map_or(value, |m| m.min(value)));
    *max = Some(max.map_or(value, |m| m.max(value)));
}

fn mean(sum: f64, count: u64) -> Option<f64> {
    (count > 0 && sum != 0.0).then(|| sum / count as f64)
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Zone;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc_config() -> StoreConfig {
        StoreConfig {
            zone: Zone::utc(),
            ..StoreConfig::default()
        }
    }

    fn observe(agg: &mut StationAggregate, t: Value, h: Value, at: DateTime<Utc>) {
        let validation = crate::validate::validate_reading(&t, &h);
        agg.observe(
            Observation {
                temperature: &t,
                humidity: &h,
                payload_timestamp: None,
                validation,
                received_at: at,
            },
            &utc_config(),
        );
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, h, m, s).unwrap()
    }

    #[test]
    fn first_contribution_initializes_min_and_max() {
        let mut bucket = HourlyBucket::default();
        bucket.record(Some(12.0), None);
        assert_eq!(bucket.count, 1);
        assert_eq!(bucket.temperature_min, Some(12.0));
        assert_eq!(bucket.temperature_max, Some(12.0));
        assert_eq!(bucket.humidity_min, None);
        assert_eq!(bucket.humidity_sum, 0.0);
    }

    #[test]
    fn observe_updates_latest_fields() {
        let mut agg = StationAggregate::new(10);
        observe(&mut agg, json!("21.5"), json!(40), at(10, 0, 0));

        assert_eq!(agg.last_temperature(), &json!("21.5"));
        assert_eq!(agg.last_received_at(), Some(at(10, 0, 0)));
        assert!(agg.last_valid());
        assert_eq!(agg.recent().len(), 1);
        assert_eq!(agg.hourly().len(), 1);
        assert_eq!(agg.daily().unwrap().date, "2024-01-02");
    }

    #[test]
    fn non_numeric_fields_are_absent_for_aggregation() {
        let mut agg = StationAggregate::new(10);
        observe(&mut agg, json!(18.0), json!("dry"), at(10, 0, 0));

        let bucket = agg.hourly().get("2024-01-02 10:00").unwrap();
        assert_eq!(bucket.count, 1);
        assert_eq!(bucket.temperature_sum, 18.0);
        assert_eq!(bucket.humidity_min, None);
        assert!(!agg.last_valid());

        let entry = agg.recent().back().unwrap();
        assert_eq!(entry.temperature, Some(18.0));
        assert_eq!(entry.humidity, None);
    }

    #[test]
    fn buffer_drops_oldest_when_full() {
        let mut agg = StationAggregate::new(3);
        for i in 0..5 {
            agg.push_recent(RecentEntry {
                at: at(10, 0, i),
                temperature: Some(i as f64),
                humidity: None,
            });
        }
        let temps: Vec<_> = agg.recent().iter().filter_map(|e| e.temperature).collect();
        assert_eq!(temps, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn hourly_buckets_split_on_hour_boundary() {
        let mut agg = StationAggregate::new(10);
        observe(&mut agg, json!(10), json!(50), at(10, 59, 59));
        observe(&mut agg, json!(20), json!(60), at(11, 0, 0));

        assert_eq!(agg.hourly().len(), 2);
        assert_eq!(agg.hourly()["2024-01-02 10:00"].count, 1);
        assert_eq!(agg.hourly()["2024-01-02 11:00"].temperature_sum, 20.0);
    }

    #[test]
    fn hourly_retention_evicts_oldest_hours() {
        let mut agg = StationAggregate::new(10);
        for hour in 0..5u32 {
            agg.update_hourly(format!("2024-01-02 {:02}:00", hour), Some(1.0), None, Some(3));
        }
        let keys: Vec<_> = agg.hourly().keys().cloned().collect();
        assert_eq!(keys, vec!["2024-01-02 02:00", "2024-01-02 03:00", "2024-01-02 04:00"]);
    }

    #[test]
    fn daily_resets_on_new_date() {
        let mut agg = StationAggregate::new(10);
        agg.update_daily("2024-01-02".into(), Some(-5.0), Some(90.0));
        agg.update_daily("2024-01-02".into(), Some(12.0), None);
        let daily = agg.daily().unwrap();
        assert_eq!(daily.temperature_min, Some(-5.0));
        assert_eq!(daily.temperature_max, Some(12.0));

        agg.update_daily("2024-01-03".into(), Some(3.0), None);
        let daily = agg.daily().unwrap();
        assert_eq!(daily.date, "2024-01-03");
        assert_eq!(daily.temperature_min, Some(3.0));
        assert_eq!(daily.temperature_max, Some(3.0));
        assert_eq!(daily.humidity_min, None);
        assert_eq!(daily.humidity_max, None);
    }

    #[test]
    fn average_is_na_for_empty_buffer() {
        let agg = StationAggregate::new(10);
        let avg = agg.average_last_minutes(5, at(10, 0, 0));
        assert_eq!(avg, RollingAverage::default());
        assert_eq!(avg.temperature_label(), "n/a");
        assert_eq!(avg.humidity_label(), "n/a");
    }

    #[test]
    fn late_reading_does_not_move_clock_back() {
        let mut agg = StationAggregate::new(10);
        observe(&mut agg, json!(20), json!(50), at(10, 0, 0));
        observe(&mut agg, json!(22), json!(55), at(9, 50, 0));

        assert_eq!(agg.last_received_at(), Some(at(10, 0, 0)));
        assert_eq!(agg.last_temperature(), &json!(22));
        let times: Vec<_> = agg.recent().iter().map(|e| e.at).collect();
        assert_eq!(times, vec![at(10, 0, 0), at(10, 0, 0)]);
        assert_eq!(agg.hourly().len(), 1);
    }

    #[test]
    fn average_only_covers_window() {
        let mut agg = StationAggregate::new(10);
        observe(&mut agg, json!(100), json!(0), at(9, 50, 0));
        observe(&mut agg, json!(10), json!(40), at(9, 56, 0));
        observe(&mut agg, json!(20), json!("n/a"), at(9, 59, 0));

        let avg = agg.average_last_minutes(5, at(10, 0, 0));
        assert_eq!(avg.temperature, Some(15.0));
        assert_eq!(avg.humidity, Some(40.0));
        assert_eq!(avg.temperature_label(), "15.0");
    }

    #[test]
    fn hourly_summaries_are_most_recent_ascending() {
        let mut agg = StationAggregate::new(10);
        for hour in 0..8u32 {
            observe(&mut agg, json!(hour as f64 + 1.0), json!(50), at(hour, 15, 0));
        }

        let summaries = agg.recent_hourly_summaries(6);
        assert_eq!(summaries.len(), 6);
        assert_eq!(summaries[0].hour, "2024-01-02 02:00");
        assert_eq!(summaries[5].hour, "2024-01-02 07:00");
        assert_eq!(summaries[5].temperature_mean, Some(8.0));

        let lines = agg.recent_hourly_lines(1);
        assert_eq!(lines, vec!["07: 1 / 8.0C / 50.0%".to_string()]);
    }

    #[test]
    fn hourly_summary_skips_zero_sums() {
        let mut agg = StationAggregate::new(10);
        observe(&mut agg, json!("x"), json!(30), at(10, 0, 0));
        let summary = &agg.recent_hourly_summaries(6)[0];
        assert_eq!(summary.temperature_mean, None);
        assert_eq!(summary.to_string(), "10: 1 / n/a / 30.0%");
    }

    #[test]
    fn daily_display_uses_units() {
        let mut daily = DailyExtremes::new("2024-01-02");
        daily.record(Some(1.5), None);
        assert_eq!(
            daily.to_string(),
            "2024-01-02 Tmin/Tmax: 1.5 °C / 1.5 °C, Hmin/Hmax: n/a / n/a"
        );
    }
}
