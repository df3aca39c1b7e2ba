use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use stationwatch::app::{App, View};
use stationwatch::duration::parse_duration;
use stationwatch::feed::{IngestClock, ReadingFeed, StreamFeed};
use stationwatch::{events, export, telemetry, ui, Settings};
use stationwatch_core::{StationStore, StoreConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stationwatch")]
#[command(about = "Live status and outage detection for weather station telemetry")]
struct Args {
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connect to a TCP endpoint streaming JSON-lines readings (host:port)
    #[arg(short, long, conflicts_with = "replay")]
    connect: Option<String>,

    /// Replay a JSON-lines file of readings
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Use each reading's own timestamp as its receive time (with --replay)
    #[arg(long, requires = "replay")]
    payload_clock: bool,

    /// Subscribe to the MQTT broker from the settings
    #[cfg(feature = "mqtt")]
    #[arg(long, conflicts_with_all = ["connect", "replay"])]
    mqtt: bool,

    /// Broker address (mqtt://host:port), overrides the settings
    #[cfg(feature = "mqtt")]
    #[arg(long, requires = "mqtt")]
    broker: Option<String>,

    /// Base topic, overrides the settings
    #[cfg(feature = "mqtt")]
    #[arg(long, requires = "mqtt")]
    topic: Option<String>,

    /// Staleness threshold (e.g., "30s", "2m")
    #[arg(long)]
    stale_after: Option<String>,

    /// Rolling average window (e.g., "5m")
    #[arg(long)]
    window: Option<String>,

    /// Timezone for hourly and daily keys: "local", "utc" or an offset like "+02:00"
    #[arg(long)]
    timezone: Option<String>,

    /// Station expected to report; repeat for several
    #[arg(long = "station")]
    stations: Vec<String>,

    /// Dashboard refresh interval in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Do not ring the terminal bell when an outage starts
    #[arg(long)]
    no_bell: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Replay, export the final state to a JSON file and exit
    #[arg(short, long, requires = "replay")]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    apply_overrides(&mut settings, &args);

    let interactive = args.export.is_none();
    telemetry::init_logging(settings.log_file.as_deref(), &settings.log_level, interactive)?;

    let store_config = store_config(&settings, &args)?;
    info!(
        stale_after_secs = store_config.stale_after.as_secs(),
        zone = %store_config.zone,
        stations = settings.stations.len(),
        "starting stationwatch"
    );

    let store = Arc::new(
        StationStore::builder()
            .config(store_config)
            .stations(settings.stations.iter())
            .build(),
    );

    let clock = if args.payload_clock {
        IngestClock::Payload
    } else {
        IngestClock::Wall
    };

    // Handle export mode (non-interactive)
    if let (Some(export_path), Some(replay)) = (&args.export, &args.replay) {
        return export_replay(replay, export_path, clock, store);
    }

    // Feeds run on the runtime's worker threads while the TUI owns the main thread
    let rt = tokio::runtime::Runtime::new()?;
    let feed = rt.block_on(open_feed(&args, &settings, clock, store.clone()))?;

    let mut app = App::new(store, feed);
    app.bell_enabled = settings.bell;

    let result = run_tui(&mut app, settings.refresh_interval());

    rt.shutdown_timeout(Duration::from_millis(500));
    result
}

/// CLI flags take precedence over the settings file and environment.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    settings.stations.extend(args.stations.iter().cloned());
    if let Some(refresh_ms) = args.refresh_ms {
        settings.refresh_ms = refresh_ms;
    }
    if args.no_bell {
        settings.bell = false;
    }
    if let Some(ref log_file) = args.log_file {
        settings.log_file = Some(log_file.clone());
    }
    if let Some(ref timezone) = args.timezone {
        settings.timezone = timezone.clone();
    }

    #[cfg(feature = "mqtt")]
    if let Some(ref topic) = args.topic {
        settings.mqtt.topic = topic.clone();
    }
}

fn store_config(settings: &Settings, args: &Args) -> Result<StoreConfig> {
    let mut config = settings.store_config()?;
    if let Some(ref stale_after) = args.stale_after {
        config.stale_after = parse_duration(stale_after).context("Invalid --stale-after")?;
    }
    if let Some(ref window) = args.window {
        config.average_window = parse_duration(window).context("Invalid --window")?;
    }
    Ok(config)
}

/// Start the feed selected on the command line.
async fn open_feed(
    args: &Args,
    #[cfg_attr(not(feature = "mqtt"), allow(unused_variables))] settings: &Settings,
    clock: IngestClock,
    store: Arc<StationStore>,
) -> Result<Box<dyn ReadingFeed>> {
    if let Some(ref addr) = args.connect {
        use tokio::net::TcpStream;

        println!("Connecting to {}...", addr);
        let stream = TcpStream::connect(addr.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;
        println!("Connected!");
        return Ok(Box::new(StreamFeed::spawn_with_clock(stream, addr, store, clock)));
    }

    if let Some(ref path) = args.replay {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let description = path.display().to_string();
        return Ok(Box::new(StreamFeed::spawn_with_clock(file, &description, store, clock)));
    }

    #[cfg(feature = "mqtt")]
    if args.mqtt {
        use stationwatch::feed::parse_broker_url;
        use stationwatch::{MqttFeed, MqttFeedConfig};

        let (host, port) = match args.broker {
            Some(ref url) => parse_broker_url(url)?,
            None => (settings.mqtt.host.clone(), settings.mqtt.port),
        };
        let mut config = MqttFeedConfig::new(host, port, settings.mqtt.topic.clone());
        config.client_id = settings.mqtt.client_id.clone();
        return Ok(Box::new(MqttFeed::spawn(config, store)));
    }

    bail!("No feed selected: use --connect, --replay or --mqtt (with the `mqtt` feature)")
}

/// Replay a recording to completion and write the export.
fn export_replay(
    replay: &Path,
    export_path: &Path,
    clock: IngestClock,
    store: Arc<StationStore>,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let (stats, last_ingest_at) = rt.block_on(async {
        let file = tokio::fs::File::open(replay)
            .await
            .with_context(|| format!("Failed to open {}", replay.display()))?;
        let description = replay.display().to_string();
        let mut feed = StreamFeed::spawn_with_clock(file, &description, store.clone(), clock);
        let stats = feed.wait().await;
        Ok::<_, anyhow::Error>((stats, feed.last_ingest_at()))
    })?;

    let snapshot = store.snapshot(last_ingest_at.unwrap_or_else(Utc::now));
    export::write_export(export_path, &snapshot, &store.outages())?;

    println!(
        "Replayed {} readings ({} rejected), exported {} stations to: {}",
        stats.received,
        stats.rejected,
        snapshot.len(),
        export_path.display()
    );
    Ok(())
}

/// Run the TUI until the user quits
fn run_tui(app: &mut App, refresh_interval: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    app.refresh(Utc::now());

    let result = run_app(&mut terminal, app, refresh_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;
    // Header (1) + tabs (1); the content block starts on the next row
    const CONTENT_START_ROW: u16 = 2;

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                ui::common::render_too_small(frame, area, MIN_WIDTH, MIN_HEIGHT);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Stations => ui::stations::render(frame, app, chunks[2]),
                View::Outages => ui::outages::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        let timeout = refresh_interval.min(Duration::from_millis(100));
        if let Some(event) = events::poll_event(timeout)? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, CONTENT_START_ROW),
                _ => {}
            }
        }

        if last_refresh.elapsed() >= refresh_interval {
            app.refresh(Utc::now());
            last_refresh = Instant::now();

            if app.take_bell() {
                let backend = terminal.backend_mut();
                backend.write_all(b"\x07")?;
                backend.flush()?;
            }
        }
    }

    Ok(())
}
