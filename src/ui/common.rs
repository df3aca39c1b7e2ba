//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, help overlay,
//! and the notice shown when the terminal is too small.

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use stationwatch_core::StationStatus;

use crate::app::{App, View};

/// Render the header bar with the station overview.
///
/// Displays: overall indicator, station counts by status, open outages.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref snapshot) = app.snapshot else {
        let line = Line::from(vec![
            Span::styled(" STATIONWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Waiting for data..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let counts = snapshot.count_by_status();
    let count = |status: StationStatus| counts.get(&status).copied().unwrap_or(0);
    let ok = count(StationStatus::Ok);
    let invalid = count(StationStatus::Invalid);
    let stale = count(StationStatus::Stale);
    let offline = count(StationStatus::Offline);

    // worst status present decides the indicator
    let worst = counts.keys().next_back().copied().unwrap_or(StationStatus::Ok);

    let count_span = |n: usize, status: StationStatus| {
        if n > 0 {
            Span::styled(n.to_string(), app.theme.status_style(status))
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        }
    };

    let open_outages = app.outages.iter().filter(|o| o.is_open()).count();

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.status_style(worst)),
        Span::styled("STATIONWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        count_span(ok, StationStatus::Ok),
        Span::raw(" ok "),
        count_span(invalid, StationStatus::Invalid),
        Span::raw(" invalid "),
        count_span(stale, StationStatus::Stale),
        Span::raw(" stale "),
        count_span(offline, StationStatus::Offline),
        Span::raw(" offline │ "),
        Span::styled(
            snapshot.len().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" stations │ "),
        Span::raw(format!("{} open outages", open_outages)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Stations "), Line::from(" 2:Outages ")];

    let selected = match app.current_view {
        View::Stations => 0,
        View::Outages => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: feed, message counters, time since the last snapshot, available
/// controls. Temporary status messages and feed errors take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.accent));
        frame.render_widget(paragraph, area);
        return;
    }

    let stats = app.feed_stats();
    let feed = format!(
        "{} ({} in, {} bad)",
        app.feed_description(),
        format_count(stats.received),
        format_count(stats.rejected)
    );

    if let Some(err) = app.feed_error() {
        let paragraph = Paragraph::new(format!(" {} | {} | q:quit", feed, err))
            .style(app.theme.error_style());
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if let Some(ref snapshot) = app.snapshot {
        let elapsed = (Utc::now() - snapshot.taken_at).num_milliseconds().max(0) as f64 / 1000.0;

        let controls = if app.filter_active {
            "Type to search | Enter:apply Esc:cancel"
        } else {
            match app.current_view {
                View::Stations => "/:search s:sort S:reverse Tab:switch Enter:detail ?:help q:quit",
                View::Outages => "/:search Tab:switch Enter:station ?:help q:quit",
            }
        };

        format!(
            " {} | {} | Updated {:.1}s ago | {}",
            app.current_view.label(),
            feed,
            elapsed,
            controls,
        )
    } else {
        format!(" {} | Waiting for data... | q:quit", feed)
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Station detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Stations & Outages",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  /         Filter by station id"),
        Line::from("  c         Clear filter"),
        Line::from("  s         Cycle sort column"),
        Line::from("  S         Toggle sort direction"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  r         Refresh now"),
        Line::from("  b         Toggle outage bell"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.accent));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 25u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Tell the user the terminal is below the minimum size.
pub fn render_too_small(frame: &mut Frame, area: Rect, min_width: u16, min_height: u16) {
    let msg = format!(
        "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
        area.width, area.height, min_width, min_height
    );
    let paragraph = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(paragraph, notice_area(area, 5));
}

/// A full-width band of `height` rows around the vertical middle, clipped to `area`.
fn notice_area(area: Rect, height: u16) -> Rect {
    let y = area.y + (area.height / 2).saturating_sub(2);
    let height = height.min(area.bottom().saturating_sub(y));
    Rect::new(area.x, y, area.width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_notice_area_fits_tiny_terminals() {
        assert_eq!(notice_area(Rect::new(0, 0, 80, 10), 5), Rect::new(0, 3, 80, 5));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 3), 5), Rect::new(0, 0, 40, 3));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 1), 5), Rect::new(0, 0, 40, 1));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 0), 5), Rect::new(0, 0, 40, 0));
    }
}
