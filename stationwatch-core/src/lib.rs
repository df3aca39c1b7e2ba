//! # stationwatch-core
//!
//! Aggregation and outage detection for station telemetry.
//!
//! Feeds hand decoded readings to a [`StationStore`], which validates them,
//! keeps per-station rolling, hourly and daily aggregates, and on every
//! [`snapshot`](StationStore::snapshot) derives each station's status and
//! records outage start/end transitions.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeDelta, Utc};
//! use serde_json::json;
//! use stationwatch_core::{StationStatus, StationStore};
//! use std::time::Duration;
//!
//! let store = StationStore::builder()
//!     .stale_after(Duration::from_secs(30))
//!     .station("harbour")
//!     .build();
//!
//! let now = Utc::now();
//! store
//!     .ingest("roof", &json!(19.4), &json!("61"), &json!(null), now)
//!     .unwrap();
//!
//! let snapshot = store.snapshot(now);
//! assert_eq!(snapshot.get("roof").unwrap().status, StationStatus::Ok);
//! assert_eq!(snapshot.get("harbour").unwrap().status, StationStatus::Offline);
//!
//! let later = store.snapshot(now + TimeDelta::seconds(45));
//! assert_eq!(later.get("roof").unwrap().status, StationStatus::Stale);
//! assert_eq!(store.outages().len(), 2);
//! ```
//!
//! ## Statuses
//!
//! - `OK`: fresh and valid
//! - `INVALID`: fresh, but the last reading failed validation
//! - `STALE`: no reading within the staleness threshold
//! - `OFFLINE`: registered, but never reported
//!
//! STALE and OFFLINE count as an outage.

pub mod aggregate;
pub mod config;
mod error;
pub mod outage;
mod reading;
mod store;
pub mod validate;
mod view;
mod zone;

pub use aggregate::{DailyExtremes, HourlyBucket, HourlySummary, RecentEntry, RollingAverage};
pub use config::{StoreBuilder, StoreConfig};
pub use error::{IngestError, ZoneParseError};
pub use outage::{OutageEvent, OutageTransition, StationStatus};
pub use reading::RawReading;
pub use store::StationStore;
pub use validate::{parse_timestamp, validate_reading, Validation};
pub use view::{format_raw, Snapshot, StationView};
pub use zone::Zone;
