//! # stationwatch
//!
//! A live dashboard and outage alarm for weather station telemetry.
//!
//! Stations publish JSON readings (`stationId`, `temperature`, `humidity`,
//! `timestamp`). Feeds decode them and hand them to a shared
//! [`StationStore`](stationwatch_core::StationStore) from `stationwatch-core`,
//! which keeps the per-station aggregates and decides who is OK, INVALID,
//! STALE or OFFLINE. This crate supplies the feeds, settings, logging setup
//! and the terminal UI around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  feed   │───▶│  store   │───▶│   app   │───▶│   ui    │ │
//! │  │ (input) │    │  (core)  │    │ (state) │    │(render) │ │
//! │  └─────────┘    └──────────┘    └─────────┘    └─────────┘ │
//! │   StreamFeed | ChannelFeed | MqttFeed                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`feed`]**: the [`ReadingFeed`] trait and its implementations for
//!   JSON-lines streams (TCP, recorded files), channels, and MQTT
//! - **[`app`]**: application state, view navigation, and user interaction logic
//! - **[`ui`]**: terminal rendering using ratatui
//! - **[`settings`]**: layered configuration from a TOML file and the environment
//! - **[`export`]**: JSON export of a snapshot and the outage log
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Live readings over TCP, one JSON object per line
//! stationwatch --connect localhost:9090 --station roof --station harbour
//!
//! # Replay a recording and export the final state
//! stationwatch --replay readings.jsonl --payload-clock --export state.json
//!
//! # Subscribe to an MQTT broker (requires the `mqtt` feature)
//! stationwatch --mqtt --broker mqtt://localhost:1883 --topic weather
//! ```
//!
//! ### As a library with a channel feed
//!
//! ```
//! use std::sync::Arc;
//! use stationwatch::{App, ChannelFeed};
//! use stationwatch_core::StationStore;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(StationStore::default());
//! let (tx, feed) = ChannelFeed::create("embedded", store.clone());
//! let app = App::new(store, Box::new(feed));
//! # });
//! ```

pub mod app;
pub mod duration;
pub mod events;
pub mod export;
pub mod feed;
pub mod settings;
pub mod telemetry;
pub mod ui;

pub use app::App;
#[cfg(feature = "mqtt")]
pub use feed::{MqttFeed, MqttFeedConfig};
pub use feed::{ChannelFeed, FeedStats, IngestClock, ReadingFeed, StreamFeed};
pub use settings::{MqttSettings, Settings};
