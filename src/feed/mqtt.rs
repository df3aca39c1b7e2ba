//! MQTT feed.
//!
//! Subscribes to a topic and everything below it, decodes each publish
//! payload as a JSON reading, and reconnects with exponential backoff when
//! the broker goes away.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use stationwatch_core::StationStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{FeedState, FeedStats, IngestClock, ReadingFeed};

/// First delay before reconnecting.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// Upper bound for the reconnect delay.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

const DEFAULT_MQTT_PORT: u16 = 1883;

/// Connection settings for [`MqttFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttFeedConfig {
    pub host: String,
    pub port: u16,
    /// Base topic; `<topic>` and `<topic>/#` are subscribed.
    pub topic: String,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl MqttFeedConfig {
    pub fn new(host: impl Into<String>, port: u16, topic: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            topic: topic.into(),
            client_id: "stationwatch".to_string(),
            keep_alive: Duration::from_secs(60),
        }
    }

    /// Topic filters subscribed on every (re)connect.
    pub fn subscriptions(&self) -> [String; 2] {
        [self.topic.clone(), format!("{}/#", self.topic)]
    }
}

/// A feed that ingests readings published on an MQTT broker.
#[derive(Debug)]
pub struct MqttFeed {
    description: String,
    state: Arc<FeedState>,
    task: JoinHandle<()>,
}

impl MqttFeed {
    /// Connect in the background and start ingesting.
    ///
    /// Connection failures are never fatal: the feed keeps retrying and
    /// reports the last failure through [`ReadingFeed::error`].
    pub fn spawn(config: MqttFeedConfig, store: Arc<StationStore>) -> Self {
        let state = Arc::new(FeedState::default());
        let description = format!("mqtt: {}:{}/{}", config.host, config.port, config.topic);
        let task = tokio::spawn(run_subscriber(config, store, state.clone()));

        Self {
            description,
            state,
            task,
        }
    }
}

impl ReadingFeed for MqttFeed {
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

impl Drop for MqttFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_subscriber(config: MqttFeedConfig, store: Arc<StationStore>, state: Arc<FeedState>) {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(options, 100);
    let mut delay = MIN_RECONNECT_DELAY;

    info!(
        host = %config.host,
        port = config.port,
        topic = %config.topic,
        "starting MQTT subscriber"
    );

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(host = %config.host, "connected to MQTT broker");
                delay = MIN_RECONNECT_DELAY;
                state.clear_error();

                // clean sessions drop subscriptions, so renew them on every connect
                for filter in config.subscriptions() {
                    if let Err(e) = client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                        warn!(topic = %filter, error = %e, "failed to subscribe");
                        state.set_error(format!("Subscribe failed: {}", e));
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                debug!("subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    topic = %publish.topic,
                    payload_size = publish.payload.len(),
                    "reading received"
                );
                state.ingest_bytes(&store, IngestClock::Wall, &publish.payload);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in_secs = delay.as_secs(),
                    "MQTT connection error, reconnecting"
                );
                state.set_error(format!("MQTT: {}", e));
                tokio::time::sleep(delay).await;
                delay = next_delay(delay);
            }
        }
    }
}

/// Double the delay, capped at [`MAX_RECONNECT_DELAY`].
fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_RECONNECT_DELAY)
}

/// Parse a broker address in the form `mqtt://host:port`, `tcp://host:port` or `host[:port]`.
pub fn parse_broker_url(url: &str) -> Result<(String, u16)> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.as_slice() {
        [host] if !host.is_empty() => Ok((host.to_string(), DEFAULT_MQTT_PORT)),
        [host, port] if !host.is_empty() => match port.parse::<u16>() {
            Ok(port) => Ok((host.to_string(), port)),
            Err(_) => bail!("Invalid port in broker URL: {}", port),
        },
        _ => bail!("Invalid broker URL format: {}", url),
    }
}
