//! Feeds that decode station readings and hand them to the store.
//!
//! A feed owns a background task that receives raw messages from some
//! transport, decodes them into [`RawReading`]s, and calls
//! [`StationStore::ingest_reading`]. Messages that cannot be decoded never
//! reach the store; they are counted and remembered as the feed's last error.

mod channel;
#[cfg(feature = "mqtt")]
mod mqtt;
mod stream;

pub use channel::ChannelFeed;
#[cfg(feature = "mqtt")]
pub use mqtt::{parse_broker_url, MqttFeed, MqttFeedConfig};
pub use stream::StreamFeed;

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use stationwatch_core::{parse_timestamp, RawReading, StationStore};
use tracing::{debug, trace};

/// Trait implemented by every reading feed.
///
/// Used by the TUI status bar to show where data comes from and whether
/// the transport is healthy.
pub trait ReadingFeed: Send + Debug {
    /// Returns a human-readable description of the feed.
    fn description(&self) -> &str;

    /// The last transport or decode error, if any.
    fn error(&self) -> Option<String>;

    /// Message counters.
    fn stats(&self) -> FeedStats;
}

/// Counters kept by every feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    /// Messages taken off the transport.
    pub received: u64,
    /// Messages that reached the store.
    pub ingested: u64,
    /// Messages that failed to decode or had no usable station id.
    pub rejected: u64,
}

/// Which instant a feed passes to the store as the receive time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestClock {
    /// The wall clock at the moment the message is handled.
    #[default]
    Wall,
    /// The reading's own timestamp, falling back to the wall clock.
    ///
    /// Used when replaying recorded data so hourly buckets and staleness
    /// follow the recording rather than the replay.
    Payload,
}

impl IngestClock {
    fn instant_for(&self, reading: &RawReading) -> DateTime<Utc> {
        match self {
            IngestClock::Wall => Utc::now(),
            IngestClock::Payload => parse_timestamp(&reading.timestamp).unwrap_or_else(Utc::now),
        }
    }
}

/// State shared between a feed and its background task.
#[derive(Debug, Default)]
pub(crate) struct FeedState {
    received: AtomicU64,
    ingested: AtomicU64,
    rejected: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_ingest_at: Mutex<Option<DateTime<Utc>>>,
}

impl FeedState {
    /// Decode one JSON payload and ingest it.
    pub(crate) fn ingest_bytes(&self, store: &StationStore, clock: IngestClock, bytes: &[u8]) {
        self.received.fetch_add(1, Ordering::Relaxed);

        match RawReading::from_slice(bytes) {
            Ok(reading) => self.ingest_reading(store, clock, &reading),
            Err(e) => {
                debug!(error = %e, "undecodable reading");
                self.reject(format!("Parse error: {}", e));
            }
        }
    }

    /// Ingest an already decoded reading.
    pub(crate) fn ingest_reading(&self, store: &StationStore, clock: IngestClock, reading: &RawReading) {
        let at = clock.instant_for(reading);
        match store.ingest_reading(reading, at) {
            Ok(()) => {
                trace!(station_id = reading.station_id(), "reading ingested");
                self.ingested.fetch_add(1, Ordering::Relaxed);
                *self.last_ingest_at.lock() = Some(at);
                self.clear_error();
            }
            Err(e) => self.reject(format!("Rejected: {}", e)),
        }
    }

    /// Count a message received outside [`ingest_bytes`](Self::ingest_bytes).
    pub(crate) fn count_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn reject(&self, message: String) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.set_error(message);
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    pub(crate) fn clear_error(&self) {
        *self.last_error.lock() = None;
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Receive time of the most recently ingested reading.
    pub(crate) fn last_ingest_at(&self) -> Option<DateTime<Utc>> {
        *self.last_ingest_at.lock()
    }

    pub(crate) fn stats(&self) -> FeedStats {
        FeedStats {
            received: self.received.load(Ordering::Relaxed),
            ingested: self.ingested.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stationwatch_core::Zone;

    #[test]
    fn test_feed_state_counts_outcomes() {
        let store = StationStore::builder().zone(Zone::utc()).build();
        let state = FeedState::default();

        state.ingest_bytes(&store, IngestClock::Wall, br#"{"stationId":"s1","temperature":20}"#);
        state.ingest_bytes(&store, IngestClock::Wall, b"{broken");
        state.ingest_bytes(&store, IngestClock::Wall, br#"{"stationId":"","temperature":20}"#);

        assert_eq!(
            state.stats(),
            FeedStats {
                received: 3,
                ingested: 1,
                rejected: 2,
            }
        );
        assert_eq!(
            state.error().as_deref(),
            Some("Rejected: missing or empty station id")
        );
        assert_eq!(store.station_count(), 1);
    }

    #[test]
    fn test_successful_ingest_clears_error() {
        let store = StationStore::default();
        let state = FeedState::default();

        state.ingest_bytes(&store, IngestClock::Wall, b"nope");
        assert!(state.error().unwrap().starts_with("Parse error"));

        state.ingest_bytes(&store, IngestClock::Wall, br#"{"stationId":"s1"}"#);
        assert!(state.error().is_none());
    }

    #[test]
    fn test_payload_clock_uses_reading_timestamp() {
        let store = StationStore::builder().zone(Zone::utc()).build();
        let state = FeedState::default();

        state.ingest_bytes(
            &store,
            IngestClock::Payload,
            br#"{"stationId":"s1","temperature":20,"humidity":50,"timestamp":"2024-01-02T12:00:00Z"}"#,
        );

        let recorded = parse_timestamp(&serde_json::json!("2024-01-02T12:00:00Z"));
        assert_eq!(state.last_ingest_at(), recorded);
        let recent = store.recent("s1").unwrap();
        assert_eq!(Some(recent[0].at), recorded);
    }
}
