//! Outages view rendering.
//!
//! Lists the outage log, most recent first. Open outages are highlighted
//! and their duration keeps growing until the station recovers.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::duration::format_age;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the Outages view.
pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(ref snapshot) = app.snapshot else {
        return;
    };
    let zone = app.store_config().zone;
    let outages = app.visible_outages();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(app.theme.frame_style());

    if outages.is_empty() {
        let message = if app.outages.is_empty() {
            " No outages recorded"
        } else {
            " No outages match the filter"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(app.theme.status.ok))
            .block(block.title(" Outages "));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Station"),
        Cell::from("Start"),
        Cell::from("End"),
        Cell::from("Duration"),
        Cell::from("State"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = outages
        .iter()
        .map(|o| {
            let state = if o.is_open() { "OPEN" } else { "closed" };
            let style = app.theme.outage_style(o.is_open());

            Row::new(vec![
                Cell::from(o.station_id.clone()),
                Cell::from(zone.format(o.start, TIME_FORMAT)),
                Cell::from(
                    o.end
                        .map(|end| zone.format(end, TIME_FORMAT))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(format_age(Some(o.duration(snapshot.taken_at)))),
                Cell::from(state).style(style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Min(19),
        Constraint::Min(19),
        Constraint::Min(9),
        Constraint::Min(6),
    ];

    let open = app.outages.iter().filter(|o| o.is_open()).count();
    let selected = app.selected_outage_index.min(outages.len().saturating_sub(1));
    let title = format!(
        " Outages ({} open, {} total) [{}/{}] ",
        open,
        app.outages.len(),
        selected + 1,
        outages.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
