//! Stations view rendering.
//!
//! Displays a table of all stations with latest values, rolling averages,
//! freshness, status, and an hourly temperature trend.

use std::cmp::Ordering;

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};
use stationwatch_core::validate::parse_number;
use stationwatch_core::{StationStatus, StationView};

use crate::app::App;
use crate::duration::format_age;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Number of hours shown in the trend column.
const TREND_HOURS: usize = 8;

/// Column to sort by in the Stations view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    /// Sort by station id alphabetically.
    #[default]
    Station,
    /// Sort by status (OK < INVALID < STALE < OFFLINE).
    Status,
    /// Sort by latest temperature.
    Temperature,
    /// Sort by latest humidity.
    Humidity,
    /// Sort by time of the last reading.
    LastSeen,
}

impl SortColumn {
    /// Cycle to the next sort column.
    pub fn next(self) -> Self {
        match self {
            SortColumn::Station => SortColumn::Status,
            SortColumn::Status => SortColumn::Temperature,
            SortColumn::Temperature => SortColumn::Humidity,
            SortColumn::Humidity => SortColumn::LastSeen,
            SortColumn::LastSeen => SortColumn::Station,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SortColumn::Station => "station",
            SortColumn::Status => "status",
            SortColumn::Temperature => "temp",
            SortColumn::Humidity => "humidity",
            SortColumn::LastSeen => "last seen",
        }
    }
}

/// Render the Stations view showing all stations in a sortable table.
pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(ref snapshot) = app.snapshot else {
        return;
    };
    let zone = app.store_config().zone;
    let stations = app.visible_stations();

    let header = Row::new(vec![
        Cell::from(format_header("Station", SortColumn::Station, app)),
        Cell::from(format_header("Temp", SortColumn::Temperature, app)),
        Cell::from(format_header("Hum", SortColumn::Humidity, app)),
        Cell::from("Ø T"),
        Cell::from("Ø H"),
        Cell::from("Payload TS"),
        Cell::from(format_header("Seen", SortColumn::LastSeen, app)),
        Cell::from("Trend"),
        Cell::from(format_header("Status", SortColumn::Status, app)),
        Cell::from("Note"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = stations
        .iter()
        .map(|s| {
            let status_style = app.theme.status_style(s.status);
            let value_style = if s.status == StationStatus::Invalid {
                app.theme.status_style(StationStatus::Invalid)
            } else {
                Style::default()
            };

            let payload_ts = s
                .last_payload_timestamp
                .map(|ts| zone.format(ts, "%H:%M:%S"))
                .unwrap_or_else(|| "-".to_string());

            Row::new(vec![
                Cell::from(s.station_id.clone()),
                Cell::from(s.temperature_raw()).style(value_style),
                Cell::from(s.humidity_raw()).style(value_style),
                Cell::from(s.average.temperature_label()),
                Cell::from(s.average.humidity_label()),
                Cell::from(payload_ts),
                Cell::from(format_age(s.age(snapshot.taken_at))),
                Cell::from(render_sparkline(&trend_levels(&hourly_means(s)))),
                Cell::from(s.status.label()).style(status_style),
                Cell::from(s.note.clone()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2), // Station
        Constraint::Min(6),  // Temp
        Constraint::Min(5),  // Hum
        Constraint::Min(6),  // Ø T
        Constraint::Min(6),  // Ø H
        Constraint::Min(10), // Payload TS
        Constraint::Min(8),  // Seen
        Constraint::Min(8),  // Trend - fixed 8 for sparkline chars
        Constraint::Min(8),  // Status
        Constraint::Fill(4), // Note - longest text
    ];

    let selected_visual_index = app.selected_station_index.min(stations.len().saturating_sub(1));
    let sort_dir = if app.sort_ascending { "↑" } else { "↓" };

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if !stations.is_empty() {
        format!(" [{}/{}]", selected_visual_index + 1, stations.len())
    } else {
        String::new()
    };

    let title = format!(
        " Stations ({}/{}) [s:sort {}{}]{}{} ",
        stations.len(),
        snapshot.len(),
        app.sort_column.label(),
        sort_dir,
        filter_info,
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(app.theme.frame_style()),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected_visual_index));

    frame.render_stateful_widget(table, area, &mut state);
}

fn format_header(name: &str, col: SortColumn, app: &App) -> Span<'static> {
    if app.sort_column == col {
        let arrow = if app.sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}

/// Sort stations by the given column and direction.
///
/// Stations without a value for the column sort before those with one.
/// Ties are broken by station id.
pub fn sort_stations_by(stations: &mut [&StationView], column: SortColumn, ascending: bool) {
    stations.sort_by(|a, b| {
        let primary = match column {
            SortColumn::Station => a.station_id.cmp(&b.station_id),
            SortColumn::Status => a.status.cmp(&b.status),
            SortColumn::Temperature => cmp_numbers(
                parse_number(&a.last_temperature),
                parse_number(&b.last_temperature),
            ),
            SortColumn::Humidity => {
                cmp_numbers(parse_number(&a.last_humidity), parse_number(&b.last_humidity))
            }
            SortColumn::LastSeen => a.last_received_at.cmp(&b.last_received_at),
        };

        let primary = if ascending {
            primary
        } else {
            primary.reverse()
        };

        if primary == Ordering::Equal {
            a.station_id.cmp(&b.station_id)
        } else {
            primary
        }
    });
}

fn cmp_numbers(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Mean temperature of each hourly bucket, oldest first.
fn hourly_means(station: &StationView) -> Vec<f64> {
    station
        .hourly
        .values()
        .filter_map(|bucket| bucket.temperature_mean())
        .collect()
}

/// Scale the last few values onto the eight sparkline levels.
fn trend_levels(values: &[f64]) -> Vec<u8> {
    let start = values.len().saturating_sub(TREND_HOURS);
    let values = &values[start..];

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    values
        .iter()
        .map(|v| {
            if range > 0.0 {
                ((v - min) / range * 7.0).round() as u8
            } else {
                3
            }
        })
        .collect()
}

fn render_sparkline(data: &[u8]) -> String {
    if data.is_empty() {
        return "        ".to_string(); // 8 spaces placeholder
    }

    data.iter().map(|&v| SPARKLINE_CHARS[v.min(7) as usize]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use serde_json::json;
    use stationwatch_core::{StationStore, Zone};

    fn snapshot() -> stationwatch_core::Snapshot {
        let store = StationStore::builder().zone(Zone::utc()).station("ghost").build();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        store
            .ingest("warm", &json!(25.0), &json!(40), &json!(null), t0)
            .unwrap();
        store
            .ingest("cold", &json!("-3.5"), &json!(80), &json!(null), t0 + TimeDelta::seconds(5))
            .unwrap();
        store.snapshot(t0 + TimeDelta::seconds(10))
    }

    fn ids(stations: &[&StationView]) -> Vec<String> {
        stations.iter().map(|s| s.station_id.clone()).collect()
    }

    #[test]
    fn test_sort_column_cycles() {
        let mut col = SortColumn::default();
        for _ in 0..5 {
            col = col.next();
        }
        assert_eq!(col, SortColumn::Station);
    }

    #[test]
    fn test_sort_by_temperature_puts_missing_first() {
        let snapshot = snapshot();
        let mut stations: Vec<&StationView> = snapshot.iter().collect();

        sort_stations_by(&mut stations, SortColumn::Temperature, true);
        assert_eq!(ids(&stations), vec!["ghost", "cold", "warm"]);

        sort_stations_by(&mut stations, SortColumn::Temperature, false);
        assert_eq!(ids(&stations), vec!["warm", "cold", "ghost"]);
    }

    #[test]
    fn test_sort_by_last_seen_and_status() {
        let snapshot = snapshot();
        let mut stations: Vec<&StationView> = snapshot.iter().collect();

        sort_stations_by(&mut stations, SortColumn::LastSeen, false);
        assert_eq!(ids(&stations), vec!["cold", "warm", "ghost"]);

        sort_stations_by(&mut stations, SortColumn::Status, true);
        assert_eq!(ids(&stations), vec!["cold", "warm", "ghost"]);
    }

    #[test]
    fn test_trend_levels_scale_to_range() {
        assert!(trend_levels(&[]).is_empty());
        assert_eq!(trend_levels(&[10.0, 10.0]), vec![3, 3]);
        assert_eq!(trend_levels(&[10.0, 15.0, 20.0]), vec![0, 4, 7]);

        let long: Vec<f64> = (0..12).map(f64::from).collect();
        let levels = trend_levels(&long);
        assert_eq!(levels.len(), TREND_HOURS);
        assert_eq!(levels.first(), Some(&0));
        assert_eq!(levels.last(), Some(&7));
    }

    #[test]
    fn test_sparkline_placeholder() {
        assert_eq!(render_sparkline(&[]), "        ");
        assert_eq!(render_sparkline(&[0, 7, 9]), "▁██");
    }
}
