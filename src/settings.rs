//! Layered application settings.
//!
//! Settings come from an optional TOML file, then environment variables
//! prefixed `STATIONWATCH_`, then command-line flags (applied by the binary).
//! Nested keys use a double underscore, e.g. `STATIONWATCH_MQTT__HOST`.
//!
//! ```toml
//! stale_after_secs = 30
//! average_window_minutes = 5
//! timezone = "+01:00"
//! stations = ["roof", "harbour"]
//!
//! [mqtt]
//! host = "localhost"
//! port = 1883
//! topic = "weather"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use stationwatch_core::config::{
    DEFAULT_AVERAGE_WINDOW, DEFAULT_BUFFER_CAPACITY, DEFAULT_STALE_AFTER, DEFAULT_SUMMARY_HOURS,
};
use stationwatch_core::{StoreConfig, Zone};

/// Prefix of environment variables read by [`Settings::load`].
pub const ENV_PREFIX: &str = "STATIONWATCH";

/// Everything the application can be configured with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stale_after_secs: u64,
    pub average_window_minutes: u64,
    pub summary_hours: usize,
    pub buffer_capacity: usize,
    /// Hourly buckets kept per station; unset keeps all.
    pub hourly_retention_hours: Option<usize>,
    /// `local`, `utc`, or a fixed offset such as `+02:00`.
    pub timezone: String,
    /// Stations expected to report, shown as OFFLINE until they do.
    pub stations: Vec<String>,
    /// Dashboard refresh interval.
    pub refresh_ms: u64,
    /// Ring the terminal bell when an outage starts.
    pub bell: bool,
    pub log_file: Option<PathBuf>,
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub mqtt: MqttSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stale_after_secs: DEFAULT_STALE_AFTER.as_secs(),
            average_window_minutes: DEFAULT_AVERAGE_WINDOW.as_secs() / 60,
            summary_hours: DEFAULT_SUMMARY_HOURS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            hourly_retention_hours: None,
            timezone: "local".to_string(),
            stations: Vec::new(),
            refresh_ms: 250,
            bell: true,
            log_file: None,
            log_level: "info".to_string(),
            mqtt: MqttSettings::default(),
        }
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            topic: "weather".to_string(),
            client_id: "stationwatch".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, environment())
    }

    /// Load settings from an optional file and the given environment source.
    pub fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Store configuration derived from these settings.
    pub fn store_config(&self) -> Result<StoreConfig> {
        let zone: Zone = self.timezone.parse()?;

        Ok(StoreConfig {
            stale_after: Duration::from_secs(self.stale_after_secs),
            average_window: Duration::from_secs(self.average_window_minutes.saturating_mul(60)),
            summary_hours: self.summary_hours,
            buffer_capacity: self.buffer_capacity,
            hourly_retention: self.hourly_retention_hours,
            zone,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(10))
    }
}

/// The environment source used by [`Settings::load`].
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("stations")
        .try_parsing(true)
}
