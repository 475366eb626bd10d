//! Common UI components shared across views.
//!
//! This module contains the header bar, status bar, and help overlay.

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::board::BoardPhase;
use crate::data::duration::format_interval;
use crate::data::format_relative;
use crate::source::Status;

/// Render the header bar: board title and group counts per status.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.title.is_empty() {
        "STATUSBOARD"
    } else {
        app.title.as_str()
    };

    if app.state.data().is_none() {
        let line = Line::from(vec![
            Span::styled(format!(" {} ", title), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Loading..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let totals = &app.totals;
    let overall = if totals.red > 0 {
        Status::Red
    } else if totals.yellow > 0 {
        Status::Yellow
    } else if totals.green > 0 {
        Status::Green
    } else {
        Status::Grey
    };

    let mut spans = vec![
        Span::styled(" ● ", app.theme.status_style(overall)),
        Span::styled(format!("{} ", title), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
    ];
    for status in [Status::Green, Status::Yellow, Status::Red, Status::Grey] {
        let count = totals.get(status);
        let style = if count > 0 {
            app.theme.status_style(status)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        spans.push(Span::styled(count.to_string(), style));
        spans.push(Span::raw(format!(" {} ", status)));
    }
    spans.push(Span::raw("│ "));
    spans.push(Span::styled(
        totals.total().to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(" groups"));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the status bar at the bottom.
///
/// Shows the data source, the age of the current snapshot and the refresh
/// cadence, plus temporary status messages. A failed refresh only shows as
/// an "Updated" time that stops moving.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let paragraph =
        Paragraph::new(status_line(app)).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

fn status_line(app: &App) -> Line<'static> {
    let state = &app.state;
    match state.phase {
        BoardPhase::Loading => Line::from(format!(
            " Loading from {}... | q:quit",
            app.source_description()
        )),
        BoardPhase::Failed(ref err) => Line::from(Span::styled(
            format!(" Error: {} | q:quit", err),
            Style::default().fg(app.theme.critical),
        )),
        BoardPhase::Ready | BoardPhase::Refreshing => {
            let updated = state
                .last_refresh
                .map(|t| format_relative(t, Utc::now()))
                .unwrap_or_else(|| "never".to_string());
            let cadence = state
                .cadence
                .map(|c| format!(" (every {})", format_interval(c)))
                .unwrap_or_default();

            let mut spans = vec![Span::raw(format!(
                " {} | Updated {}{}",
                app.source_description(),
                updated,
                cadence
            ))];
            if state.busy {
                spans.push(Span::styled(
                    " | refreshing...",
                    Style::default().fg(app.theme.highlight),
                ));
            }
            spans.push(Span::raw(
                " | ←↑↓→:select Enter:detail r:refresh ?:help q:quit",
            ));
            Line::from(spans)
        }
    }
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Board"),
        Line::from("  ←↑↓→ hjkl   Select tile"),
        Line::from("  Home/End    First/last tile"),
        Line::from("  Enter       Group detail"),
        Line::from("  Click       Group detail"),
        Line::from(""),
        section(" Group detail"),
        Line::from("  ↑/↓ j/k     Select endpoint"),
        Line::from("  Enter / b   Show response body"),
        Line::from("  PgUp/PgDn   Scroll body"),
        Line::from("  r           Re-probe endpoint"),
        Line::from("  Esc         Close"),
        Line::from(""),
        section(" General"),
        Line::from("  r / R       Re-probe everything"),
        Line::from("  e           Export to JSON"),
        Line::from("  q           Quit"),
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
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 24u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
