//! Colours for the dashboard.
//!
//! Every station status has its own colour so the table, header counts and
//! detail overlay agree on what OK, INVALID, STALE and OFFLINE look like.
//! The palette is picked from the terminal background at startup.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use stationwatch_core::StationStatus;

/// One colour per station status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPalette {
    pub ok: Color,
    pub invalid: Color,
    pub stale: Color,
    pub offline: Color,
}

impl StatusPalette {
    pub fn color(&self, status: StationStatus) -> Color {
        match status {
            StationStatus::Ok => self.ok,
            StationStatus::Invalid => self.invalid,
            StationStatus::Stale => self.stale,
            StationStatus::Offline => self.offline,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub status: StatusPalette,
    /// Overlay borders, status messages and the active tab.
    pub accent: Color,
    /// Table and pane borders.
    pub frame: Color,
    pub header: Style,
    pub selected: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
}

impl Theme {
    fn with_colors(status: StatusPalette, accent: Color, frame: Color, selection: Color) -> Self {
        Self {
            status,
            accent,
            frame,
            header: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(selection).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(frame),
            border_type: BorderType::Rounded,
        }
    }

    /// Palette for dark backgrounds.
    pub fn dark() -> Self {
        Self::with_colors(
            StatusPalette {
                ok: Color::Green,
                invalid: Color::Yellow,
                stale: Color::Red,
                offline: Color::Magenta,
            },
            Color::Cyan,
            Color::Gray,
            Color::DarkGray,
        )
    }

    /// Palette for light backgrounds. Yellow is unreadable on white, so
    /// INVALID uses the darker variant.
    pub fn light() -> Self {
        Self::with_colors(
            StatusPalette {
                ok: Color::Green,
                invalid: Color::Rgb(175, 120, 0),
                stale: Color::Red,
                offline: Color::Magenta,
            },
            Color::Blue,
            Color::DarkGray,
            Color::LightBlue,
        )
    }

    /// Choose by the terminal's background luminance, falling back to dark.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) => Self::for_luma(luma),
            Err(_) => Self::dark(),
        }
    }

    fn for_luma(luma: f32) -> Self {
        if luma > 0.5 {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Outage statuses are bold so they stand out in a long table.
    pub fn status_style(&self, status: StationStatus) -> Style {
        let style = Style::default().fg(self.status.color(status));
        if status.is_outage() {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// State cell in the outage log.
    pub fn outage_style(&self, open: bool) -> Style {
        if open {
            Style::default().fg(self.status.stale).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        }
    }

    /// Validation errors and feed errors.
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.status.invalid)
    }

    pub fn frame_style(&self) -> Style {
        Style::default().fg(self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outage_statuses_are_bold() {
        let theme = Theme::dark();
        for status in [StationStatus::Stale, StationStatus::Offline] {
            assert!(theme.status_style(status).add_modifier.contains(Modifier::BOLD));
        }
        assert!(!theme
            .status_style(StationStatus::Invalid)
            .add_modifier
            .contains(Modifier::BOLD));
        assert_eq!(theme.status_style(StationStatus::Ok).fg, Some(Color::Green));
    }

    #[test]
    fn test_every_status_has_a_distinct_color() {
        for theme in [Theme::dark(), Theme::light()] {
            let colors: Vec<_> = [
                StationStatus::Ok,
                StationStatus::Invalid,
                StationStatus::Stale,
                StationStatus::Offline,
            ]
            .into_iter()
            .map(|s| theme.status.color(s))
            .collect();
            for (i, a) in colors.iter().enumerate() {
                assert!(colors[i + 1..].iter().all(|b| a != b));
            }
        }
    }

    #[test]
    fn test_luma_picks_palette() {
        assert_eq!(Theme::for_luma(0.9).accent, Color::Blue);
        assert_eq!(Theme::for_luma(0.1).accent, Color::Cyan);
        assert_eq!(Theme::for_luma(0.5).accent, Color::Cyan);
    }

    #[test]
    fn test_outage_style_marks_open_events() {
        let theme = Theme::dark();
        assert_eq!(theme.outage_style(true).fg, Some(Color::Red));
        assert!(theme.outage_style(false).add_modifier.contains(Modifier::DIM));
    }
}
