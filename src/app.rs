//! Application state and navigation logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use stationwatch_core::{OutageEvent, Snapshot, StationStore, StationView, StoreConfig};

use crate::export;
use crate::feed::{FeedStats, ReadingFeed};
use crate::ui::stations::{sort_stations_by, SortColumn};
use crate::ui::Theme;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Default file written by the export key.
pub const DEFAULT_EXPORT_PATH: &str = "stationwatch_export.json";

/// The current view/tab in the TUI.
///
/// Station detail is shown as an overlay (controlled by `App::show_detail_overlay`)
/// rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live status of every station.
    Stations,
    /// The outage log, most recent first.
    Outages,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Stations => View::Outages,
            View::Outages => View::Stations,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        // two views, so previous and next coincide
        self.next()
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Stations => "Stations",
            View::Outages => "Outages",
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Data
    store: Arc<StationStore>,
    feed: Box<dyn ReadingFeed>,
    pub snapshot: Option<Snapshot>,
    pub outages: Vec<OutageEvent>,

    // Navigation state
    pub selected_station_index: usize,
    pub selected_outage_index: usize,

    // Sorting (Stations view)
    pub sort_column: SortColumn,
    pub sort_ascending: bool,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,
    pub bell_enabled: bool,
    pending_bell: bool,
    pub export_path: PathBuf,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading from `store`, with `feed` shown in the status bar.
    pub fn new(store: Arc<StationStore>, feed: Box<dyn ReadingFeed>) -> Self {
        Self::with_theme(store, feed, Theme::auto_detect())
    }

    /// Create a new App with an explicit theme.
    pub fn with_theme(store: Arc<StationStore>, feed: Box<dyn ReadingFeed>, theme: Theme) -> Self {
        Self {
            running: true,
            current_view: View::Stations,
            show_help: false,
            show_detail_overlay: false,
            store,
            feed,
            snapshot: None,
            outages: Vec::new(),
            selected_station_index: 0,
            selected_outage_index: 0,
            sort_column: SortColumn::default(),
            sort_ascending: true,
            filter_text: String::new(),
            filter_active: false,
            theme,
            bell_enabled: true,
            pending_bell: false,
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            status_message: None,
        }
    }

    /// Returns a description of the current feed.
    pub fn feed_description(&self) -> &str {
        self.feed.description()
    }

    /// The feed's last error, if any.
    pub fn feed_error(&self) -> Option<String> {
        self.feed.error()
    }

    pub fn feed_stats(&self) -> FeedStats {
        self.feed.stats()
    }

    pub fn store_config(&self) -> &StoreConfig {
        self.store.config()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    /// Take a fresh snapshot of the store.
    ///
    /// Outage transitions found by the snapshot are announced in the status
    /// bar; a new outage also arms the bell.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        let snapshot = self.store.snapshot(now);

        if let Some(start) = snapshot.transitions.iter().find(|t| t.is_start()) {
            self.set_status_message(format!("ALARM {}", start));
            if self.bell_enabled {
                self.pending_bell = true;
            }
        } else if let Some(end) = snapshot.transitions.last() {
            self.set_status_message(end.to_string());
        }

        self.outages = self.store.outages();
        self.snapshot = Some(snapshot);
        self.clamp_selection();
    }

    /// Returns true once per armed bell.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.pending_bell)
    }

    fn clamp_selection(&mut self) {
        let stations = self.visible_stations().len();
        let outages = self.visible_outages().len();
        self.selected_station_index = self.selected_station_index.min(stations.saturating_sub(1));
        self.selected_outage_index = self.selected_outage_index.min(outages.saturating_sub(1));
    }

    /// Stations after filtering and sorting, in display order.
    pub fn visible_stations(&self) -> Vec<&StationView> {
        let Some(ref snapshot) = self.snapshot else {
            return Vec::new();
        };

        let mut stations: Vec<&StationView> = snapshot
            .iter()
            .filter(|s| self.matches_filter(&s.station_id))
            .collect();
        sort_stations_by(&mut stations, self.sort_column, self.sort_ascending);
        stations
    }

    /// Outage log entries after filtering, most recent first.
    pub fn visible_outages(&self) -> Vec<&OutageEvent> {
        self.outages
            .iter()
            .rev()
            .filter(|o| self.matches_filter(&o.station_id))
            .collect()
    }

    /// The station under the cursor in the Stations view.
    pub fn selected_station(&self) -> Option<&StationView> {
        self.visible_stations()
            .get(self.selected_station_index)
            .copied()
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        match self.current_view {
            View::Stations => {
                let max = self.visible_stations().len().saturating_sub(1);
                self.selected_station_index = (self.selected_station_index + n).min(max);
            }
            View::Outages => {
                let max = self.visible_outages().len().saturating_sub(1);
                self.selected_outage_index = (self.selected_outage_index + n).min(max);
            }
        }
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        match self.current_view {
            View::Stations => {
                self.selected_station_index = self.selected_station_index.saturating_sub(n);
            }
            View::Outages => {
                self.selected_outage_index = self.selected_outage_index.saturating_sub(n);
            }
        }
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        match self.current_view {
            View::Stations => self.selected_station_index = 0,
            View::Outages => self.selected_outage_index = 0,
        }
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        match self.current_view {
            View::Stations => {
                self.selected_station_index = self.visible_stations().len().saturating_sub(1);
            }
            View::Outages => {
                self.selected_outage_index = self.visible_outages().len().saturating_sub(1);
            }
        }
    }

    /// Open the detail overlay for the selected station.
    ///
    /// From the Outages view this jumps to the station of the selected outage.
    pub fn enter_detail(&mut self) {
        if self.current_view == View::Outages {
            let Some(station_id) = self
                .visible_outages()
                .get(self.selected_outage_index)
                .map(|o| o.station_id.clone())
            else {
                return;
            };
            let Some(index) = self
                .visible_stations()
                .iter()
                .position(|s| s.station_id == station_id)
            else {
                return;
            };
            self.selected_station_index = index;
            self.current_view = View::Stations;
        }

        if self.selected_station().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlay first, then go to Stations.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
            return;
        }
        self.current_view = View::Stations;
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Cycle to the next sort column.
    pub fn cycle_sort(&mut self) {
        if self.current_view == View::Stations {
            self.sort_column = self.sort_column.next();
        }
    }

    /// Toggle sort direction between ascending and descending.
    pub fn toggle_sort_direction(&mut self) {
        if self.current_view == View::Stations {
            self.sort_ascending = !self.sort_ascending;
        }
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.clamp_selection();
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
    }

    /// Check if a station id matches the current filter.
    pub fn matches_filter(&self, station_id: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        station_id
            .to_lowercase()
            .contains(&self.filter_text.to_lowercase())
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export the current snapshot and outage log to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(ref snapshot) = self.snapshot else {
            anyhow::bail!("No data to export");
        };
        export::write_export(path, snapshot, &self.outages)
    }
}
