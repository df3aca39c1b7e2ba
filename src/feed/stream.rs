//! Stream-based feed.
//!
//! Reads newline-delimited JSON readings from an async byte stream. This
//! covers TCP connections, recorded files, and message bus bridges that
//! forward raw payload bytes.

use std::sync::Arc;

use stationwatch_core::StationStore;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{FeedState, FeedStats, IngestClock, ReadingFeed};

/// A feed that ingests readings from an async stream.
///
/// A background task reads one JSON object per line and passes each to
/// the store. Blank lines are skipped.
///
/// # Example with a byte stream
///
/// ```
/// use std::io::Cursor;
/// use std::sync::Arc;
/// use stationwatch::StreamFeed;
/// use stationwatch_core::StationStore;
///
/// # tokio_test::block_on(async {
/// let store = Arc::new(StationStore::default());
/// let data = b"{\"stationId\":\"roof\",\"temperature\":18.5,\"humidity\":60}\n";
/// let mut feed = StreamFeed::spawn(Cursor::new(data.to_vec()), "example", store.clone());
/// let stats = feed.wait().await;
/// assert_eq!(stats.ingested, 1);
/// assert_eq!(store.station_count(), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct StreamFeed {
    description: String,
    state: Arc<FeedState>,
    task: Option<JoinHandle<()>>,
}

impl StreamFeed {
    /// Spawn a background task that reads from the given async reader.
    pub fn spawn<R>(reader: R, description: &str, store: Arc<StationStore>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::spawn_with_clock(reader, description, store, IngestClock::Wall)
    }

    /// Like [`spawn`](Self::spawn), choosing which instant counts as the receive time.
    pub fn spawn_with_clock<R>(
        reader: R,
        description: &str,
        store: Arc<StationStore>,
        clock: IngestClock,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let state = Arc::new(FeedState::default());
        let task_state = state.clone();
        let source = description.to_string();

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        info!(source = %source, "stream closed");
                        task_state.set_error("Connection closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        task_state.ingest_bytes(&store, clock, trimmed.as_bytes());
                    }
                    Err(e) => {
                        warn!(source = %source, error = %e, "stream read failed");
                        task_state.set_error(format!("Read error: {}", e));
                        break;
                    }
                }
            }
        });

        Self {
            description: format!("stream: {}", description),
            state,
            task: Some(task),
        }
    }

    /// Create a feed from a channel of raw payloads.
    ///
    /// Useful when another transport already delivers one JSON document
    /// per message.
    pub fn from_bytes_channel(
        mut rx: mpsc::Receiver<Vec<u8>>,
        description: &str,
        store: Arc<StationStore>,
    ) -> Self {
        let state = Arc::new(FeedState::default());
        let task_state = state.clone();

        let task = tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                task_state.ingest_bytes(&store, IngestClock::Wall, &bytes);
            }
        });

        Self {
            description: format!("stream: {}", description),
            state,
            task: Some(task),
        }
    }

    /// True once the underlying stream has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Receive time of the most recently ingested reading.
    pub fn last_ingest_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.state.last_ingest_at()
    }

    /// Wait for the stream to end and return the final counters.
    pub async fn wait(&mut self) -> FeedStats {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                self.state.set_error(format!("Feed task failed: {}", e));
            }
        }
        self.state.stats()
    }
}

impl ReadingFeed for StreamFeed {
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

impl Drop for StreamFeed {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
