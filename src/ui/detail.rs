//! Detail overlay rendering.
//!
//! Displays a modal overlay with everything known about the selected station.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use stationwatch_core::aggregate::format_measure;

use crate::app::App;
use crate::duration::format_age;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 16;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the station detail as a modal overlay.
///
/// Shows the latest reading, averages, daily extremes, the hourly buckets
/// and the validation errors of the selected station.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    // Skip rendering if terminal is too small for the overlay
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(ref snapshot) = app.snapshot else {
        return;
    };
    let Some(station) = app.selected_station() else {
        return;
    };
    let config = app.store_config();
    let zone = config.zone;

    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 110);
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 50);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(9), // Header with station info
        Constraint::Min(5),    // Hourly buckets and errors
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    // ===== HEADER SECTION =====
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let format_ts = |ts: Option<chrono::DateTime<chrono::Utc>>| {
        ts.map(|ts| zone.format(ts, TIME_FORMAT))
            .unwrap_or_else(|| "-".to_string())
    };

    let outage_line = match app
        .outages
        .iter()
        .rev()
        .find(|o| o.station_id == station.station_id && o.is_open())
    {
        Some(open) => Span::styled(
            format!(
                "open since {} ({})",
                zone.format(open.start, TIME_FORMAT),
                format_age(Some(open.duration(snapshot.taken_at)))
            ),
            app.theme.status_style(station.status),
        ),
        None => Span::raw("none"),
    };

    let daily = station
        .daily
        .as_ref()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    let header_lines = vec![
        Line::from(vec![
            Span::styled(format!(" {} ", station.station_id), bold),
            Span::styled(
                format!(" {} ", station.status),
                app.theme.status_style(station.status).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {}", station.reason)),
        ]),
        Line::from(vec![
            Span::raw(" Temperature: "),
            Span::styled(station.temperature_raw(), bold),
            Span::raw("    Humidity: "),
            Span::styled(station.humidity_raw(), bold),
            Span::raw(format!(
                "    Ø {} min: {} / {}",
                config.average_window.as_secs() / 60,
                format_measure(station.average.temperature, "°C"),
                format_measure(station.average.humidity, "%"),
            )),
        ]),
        Line::from(format!(
            " Payload TS: {}    Received: {} ({} ago)",
            format_ts(station.last_payload_timestamp),
            format_ts(station.last_received_at),
            format_age(station.age(snapshot.taken_at)),
        )),
        Line::from(format!(" Today: {}", daily)),
        Line::from(format!(
            " Readings: {}    Buffered: {}/{}",
            station.readings_total, station.recent_len, config.buffer_capacity
        )),
        Line::from(vec![Span::raw(" Outage: "), outage_line]),
        Line::from(format!(" Note: {}", station.note)),
    ];

    let header_block = Block::default()
        .title(" Station Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.accent));

    frame.render_widget(Paragraph::new(header_lines).block(header_block), chunks[0]);

    // ===== CONTENT SECTION (Hourly and Errors) =====
    let content_chunks = Layout::horizontal([
        Constraint::Percentage(65), // Hourly
        Constraint::Percentage(35), // Errors
    ])
    .split(chunks[1]);

    // ----- HOURLY TABLE -----
    let hourly_header = Row::new(vec![
        Cell::from("Hour"),
        Cell::from("Count"),
        Cell::from("Ø T"),
        Cell::from("Ø H"),
        Cell::from("T min/max"),
    ])
    .height(1)
    .style(app.theme.header);

    let hourly_rows: Vec<Row> = station
        .hourly
        .iter()
        .rev()
        .map(|(hour, bucket)| {
            Row::new(vec![
                Cell::from(hour.clone()),
                Cell::from(bucket.count.to_string()),
                Cell::from(format_measure(bucket.temperature_mean(), "")),
                Cell::from(format_measure(bucket.humidity_mean(), "")),
                Cell::from(format!(
                    "{} / {}",
                    format_measure(bucket.temperature_min, ""),
                    format_measure(bucket.temperature_max, "")
                )),
            ])
        })
        .collect();

    let hourly_widths = [
        Constraint::Fill(2),   // Hour
        Constraint::Length(7), // Count
        Constraint::Length(7), // Ø T
        Constraint::Length(7), // Ø H
        Constraint::Fill(1),   // T min/max
    ];

    let hourly_table = Table::new(hourly_rows, hourly_widths)
        .header(hourly_header)
        .block(
            Block::default()
                .title(format!(" Hourly ({}) ", station.hourly.len()))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(app.theme.frame_style()),
        );
    frame.render_widget(hourly_table, content_chunks[0]);

    // ----- ERRORS -----
    let error_lines: Vec<Line> = if station.last_errors.is_empty() {
        vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No validation errors",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ]
    } else {
        station
            .last_errors
            .iter()
            .map(|e| Line::from(Span::styled(format!(" {}", e), app.theme.error_style())))
            .collect()
    };

    let errors = Paragraph::new(error_lines).block(
        Block::default()
            .title(format!(" Last errors ({}) ", station.last_errors.len()))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(app.theme.frame_style()),
    );
    frame.render_widget(errors, content_chunks[1]);

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " ↑↓ next station | Esc to close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}
