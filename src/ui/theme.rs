//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::source::Status;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Unknown status.
    pub unknown: Color,
    /// Healthy status.
    pub healthy: Color,
    /// Degraded status.
    pub warning: Color,
    /// Failing status.
    pub critical: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for the selected tile or row.
    pub selected: Style,
    /// Style for category dividers.
    pub divider: Style,
    /// Border style for tiles and dialogs.
    pub border_type: BorderType,
    /// Border style of the selected tile.
    pub selected_border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            unknown: Color::DarkGray,
            healthy: Color::Green,
            warning: Color::Yellow,
            critical: Color::Red,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            divider: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            border_type: BorderType::Rounded,
            selected_border_type: BorderType::Thick,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            unknown: Color::Gray,
            healthy: Color::Green,
            warning: Color::Yellow,
            critical: Color::Red,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            divider: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
            selected_border_type: BorderType::Thick,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Grey => self.unknown,
            Status::Green => self.healthy,
            Status::Yellow => self.warning,
            Status::Red => self.critical,
        }
    }

    /// Get style for a health status
    pub fn status_style(&self, status: Status) -> Style {
        let style = Style::default().fg(self.status_color(status));
        match status {
            Status::Red => style.add_modifier(Modifier::BOLD),
            _ => style,
        }
    }

    /// Style for anything belonging to an inactive group or endpoint.
    pub fn inactive_style(&self) -> Style {
        Style::default().fg(self.unknown).add_modifier(Modifier::DIM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_has_a_distinct_color() {
        let theme = Theme::dark();
        let mut colors: Vec<_> = Status::ALL.iter().map(|s| theme.status_color(*s)).collect();
        colors.dedup();
        assert_eq!(colors.len(), Status::ALL.len());
    }

    #[test]
    fn test_red_is_bold() {
        let theme = Theme::light();
        assert!(theme.status_style(Status::Red).add_modifier.contains(Modifier::BOLD));
        assert!(!theme.status_style(Status::Green).add_modifier.contains(Modifier::BOLD));
    }
}
