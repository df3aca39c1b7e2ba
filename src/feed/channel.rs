//! Channel-based feed.
//!
//! Receives already decoded readings through a tokio mpsc channel. This is
//! the entry point for embedding: any transport that produces
//! [`RawReading`]s can push them without going through JSON text.

use std::sync::Arc;

use stationwatch_core::{RawReading, StationStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{FeedState, FeedStats, IngestClock, ReadingFeed};

/// Capacity of the channel created by [`ChannelFeed::create`].
const CHANNEL_CAPACITY: usize = 256;

/// A feed that ingests readings pushed through a channel.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stationwatch::ChannelFeed;
/// use stationwatch_core::{RawReading, StationStore};
///
/// # tokio_test::block_on(async {
/// let store = Arc::new(StationStore::default());
/// let (tx, feed) = ChannelFeed::create("embedded", store.clone());
/// tx.send(RawReading::new("roof", 18.5, 60, "2024-01-02T12:00:00Z")).await.unwrap();
/// # });
/// ```
#[derive(Debug)]
pub struct ChannelFeed {
    description: String,
    state: Arc<FeedState>,
    task: JoinHandle<()>,
}

impl ChannelFeed {
    /// Start ingesting from `receiver`.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of an mpsc channel
    /// * `source_description` - Where readings come from (e.g. "mqtt://broker/weather")
    /// * `store` - The store readings are ingested into
    pub fn new(
        mut receiver: mpsc::Receiver<RawReading>,
        source_description: &str,
        store: Arc<StationStore>,
    ) -> Self {
        let state = Arc::new(FeedState::default());
        let task_state = state.clone();
        let source = source_description.to_string();

        let task = tokio::spawn(async move {
            while let Some(reading) = receiver.recv().await {
                task_state.count_received();
                task_state.ingest_reading(&store, IngestClock::Wall, &reading);
            }
            debug!(source = %source, "all senders dropped");
            task_state.set_error("Channel closed");
        });

        Self {
            description: format!("channel: {}", source_description),
            state,
            task,
        }
    }

    /// Create a channel pair.
    ///
    /// Returns (sender, feed) where the sender pushes readings into the store.
    pub fn create(
        source_description: &str,
        store: Arc<StationStore>,
    ) -> (mpsc::Sender<RawReading>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Self::new(rx, source_description, store))
    }

    /// True once every sender has been dropped and the backlog is drained.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

impl ReadingFeed for ChannelFeed {
    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.state.error()
    }

    fn stats(&self) -> FeedStats {
        self.state.stats()
    }
}

impl Drop for ChannelFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use stationwatch_core::{StationStatus, Zone};

    #[tokio::test]
    async fn test_channel_feed_ingests_readings() {
        let store = Arc::new(StationStore::builder().zone(Zone::utc()).build());
        let (tx, feed) = ChannelFeed::create("test", store.clone());
        assert_eq!(feed.description(), "channel: test");

        tx.send(RawReading::new("s1", 20.5, 40, "2024-01-02T12:00:00Z"))
            .await
            .unwrap();
        tx.send(RawReading::new("s2", "-999", 40, json!(null)))
            .await
            .unwrap();
        tx.send(RawReading::new("  ", 20, 40, json!(null)))
            .await
            .unwrap();
        drop(tx);

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert!(feed.is_closed());
        assert_eq!(
            feed.stats(),
            FeedStats {
                received: 3,
                ingested: 2,
                rejected: 1,
            }
        );
        assert_eq!(feed.error().as_deref(), Some("Channel closed"));

        let snapshot = store.snapshot(Utc::now());
        assert_eq!(snapshot.get("s1").unwrap().status, StationStatus::Ok);
        assert_eq!(snapshot.get("s2").unwrap().status, StationStatus::Invalid);
    }
}
