//! Constructor-time configuration for the station store.

use std::time::Duration;

use crate::zone::Zone;

/// Default staleness threshold.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);
/// Default rolling-average window.
pub const DEFAULT_AVERAGE_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Default number of hours reported in hourly summaries.
pub const DEFAULT_SUMMARY_HOURS: usize = 6;
/// Default capacity of each station's recent-reading buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2000;

/// Settings fixed when a [`StationStore`](crate::StationStore) is built.
///
/// These are not mutable at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Age of the last reading after which a station is stale.
    pub stale_after: Duration,
    /// Span of the rolling average.
    pub average_window: Duration,
    /// Number of most recent hours included in hourly summaries.
    pub summary_hours: usize,
    /// Maximum entries in each station's recent-reading buffer.
    pub buffer_capacity: usize,
    /// Number of hourly buckets kept per station; `None` keeps them all.
    pub hourly_retention: Option<usize>,
    /// Timezone used for hour and date keys.
    pub zone: Zone,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            average_window: DEFAULT_AVERAGE_WINDOW,
            summary_hours: DEFAULT_SUMMARY_HOURS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            hourly_retention: None,
            zone: Zone::Local,
        }
    }
}

/// Builder for a [`StationStore`](crate::StationStore).
///
/// # Example
///
/// ```rust
/// use stationwatch_core::{StationStore, Zone};
/// use std::time::Duration;
///
/// let store = StationStore::builder()
///     .stale_after(Duration::from_secs(60))
///     .hourly_retention(48)
///     .zone(Zone::utc())
///     .build();
///
/// assert_eq!(store.config().stale_after, Duration::from_secs(60));
/// ```
#[derive(Debug, Default)]
pub struct StoreBuilder {
    config: StoreConfig,
    stations: Vec<String>,
}

impl StoreBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staleness threshold.
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.config.stale_after = stale_after;
        self
    }

    /// Set the rolling-average window.
    pub fn average_window(mut self, window: Duration) -> Self {
        self.config.average_window = window;
        self
    }

    /// Set how many recent hours the hourly summaries cover.
    pub fn summary_hours(mut self, hours: usize) -> Self {
        self.config.summary_hours = hours;
        self
    }

    /// Set the capacity of each station's recent-reading buffer.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Keep only the `hours` most recent hourly buckets per station.
    pub fn hourly_retention(mut self, hours: usize) -> Self {
        self.config.hourly_retention = Some(hours);
        self
    }

    /// Set the zone used for hour and date keys.
    pub fn zone(mut self, zone: Zone) -> Self {
        self.config.zone = zone;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare a station that is expected to report.
    pub fn station(mut self, station_id: impl Into<String>) -> Self {
        self.stations.push(station_id.into());
        self
    }

    /// Declare several expected stations.
    pub fn stations<I, S>(mut self, station_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stations.extend(station_ids.into_iter().map(Into::into));
        self
    }

    /// Build the store, registering any declared stations.
    pub fn build(self) -> crate::StationStore {
        let store = crate::StationStore::new(self.config);
        for station_id in &self.stations {
            // `register` warns about and skips empty ids
            let _ = store.register(station_id);
        }
        store
    }
}
