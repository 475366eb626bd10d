//! Group detail overlay.
//!
//! Lists every endpoint of one group with its response code and probe age,
//! and lets the user open the captured response body of an endpoint.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};
use tokio::sync::oneshot;

use crate::app::App;
use crate::data::duration::format_interval;
use crate::data::{format_relative_str, resolve_endpoint_key, resolve_endpoint_url};
use crate::data::{BodyKind, BodyView};
use crate::layout::{self, BoxSize, Element, Reference};
use crate::source::{Group, Snapshot, Status};

/// Code text for the no-response sentinel and for missing records.
pub const NO_CODE: &str = "—";

/// Code the backend reports when the response body could not be read.
pub const BODY_READ_ERROR_CODE: i64 = 998;

/// Fraction of the terminal the dialog is fitted to.
const DIALOG_FIT_TARGET: f64 = 0.9;
/// Body viewer width limits, as fractions of the terminal width.
const BODY_MIN_WIDTH: f64 = 0.30;
const BODY_MAX_WIDTH: f64 = 0.85;

/// One endpoint row of the detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub name: String,
    /// Resolved URL, only when it is absolute.
    pub link: Option<String>,
    pub status: Status,
    pub code: String,
    pub time: String,
    /// How long the last probe took, e.g. `"120ms"`.
    pub took: Option<String>,
    pub inactive: bool,
    /// Decoded body; `None` for inactive endpoints and records without one.
    pub body: Option<BodyView>,
    /// The backend could not read the response body.
    pub body_error: bool,
}

/// Drill-down data for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDetail {
    pub group_index: usize,
    pub group_name: String,
    pub title: String,
    /// Active endpoints first; declaration order otherwise kept.
    pub rows: Vec<DetailRow>,
}

impl GroupDetail {
    pub fn build(
        group_index: usize,
        group: &Group,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
        no_response_code: i64,
    ) -> Self {
        let mut endpoints: Vec<_> = group.endpoints.iter().collect();
        endpoints.sort_by_key(|e| e.inactive);

        let rows = endpoints
            .into_iter()
            .map(|endpoint| {
                let record = snapshot.get(&resolve_endpoint_key(group, endpoint));

                let code = match record {
                    Some(r) if r.code != no_response_code => r.code.to_string(),
                    _ => NO_CODE.to_string(),
                };
                let time = if endpoint.inactive {
                    "inactive".to_string()
                } else {
                    format_relative_str(record.and_then(|r| r.updated.as_deref()), now)
                };
                let body = record
                    .filter(|_| !endpoint.inactive)
                    .and_then(|r| {
                        r.body
                            .as_deref()
                            .filter(|b| !b.is_empty())
                            .map(|b| BodyView::decode(b, &r.content_type))
                    });

                DetailRow {
                    name: endpoint.name.clone(),
                    link: resolve_endpoint_url(group, endpoint).map(String::from),
                    status: record.and_then(|r| r.status).unwrap_or(Status::Grey),
                    code,
                    time,
                    took: record
                        .and_then(|r| r.request_duration)
                        .and_then(|d| Duration::try_from_secs_f64(d).ok())
                        .map(format_interval),
                    inactive: endpoint.inactive,
                    body,
                    body_error: record.is_some_and(|r| r.code == BODY_READ_ERROR_CODE),
                }
            })
            .collect();

        Self {
            group_index,
            group_name: group.name.clone(),
            title: format!("Group Status for \"{}\"", group.name),
            rows,
        }
    }

    /// Unscaled size of the dialog content, in cells.
    fn natural_size(&self) -> BoxSize {
        let name = self.rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
        let code = self.rows.iter().map(|r| r.code.chars().count()).max().unwrap_or(0);
        let time = self.rows.iter().map(|r| r.time.chars().count()).max().unwrap_or(0);

        // dot + columns + spacing + body marker + borders
        let columns = 2 + name.max(8) + code.max(4) + time.max(4) + 8 + 8 + 2 * 4 + 2;
        let width = columns.max(self.title.chars().count() + 4);
        // header + rows + link line + borders
        let height = self.rows.len() + 1 + 2 + 2;
        BoxSize::new(width as f64, height as f64)
    }
}

/// Resolves when the detail dialog it was returned with is dismissed.
#[derive(Debug)]
pub struct DetailClosed {
    rx: oneshot::Receiver<()>,
}

impl DetailClosed {
    /// Whether the dialog has been dismissed, without waiting.
    pub fn is_closed(&mut self) -> bool {
        !matches!(self.rx.try_recv(), Err(oneshot::error::TryRecvError::Empty))
    }
}

impl Future for DetailClosed {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender counts as closed too.
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

/// An open detail dialog.
///
/// Dropping the dialog dismisses it and resolves its [`DetailClosed`].
#[derive(Debug)]
pub struct DetailDialog {
    pub detail: GroupDetail,
    pub selected: usize,
    pub body_open: bool,
    pub body_scroll: u16,
    closed_tx: Option<oneshot::Sender<()>>,
}

impl DetailDialog {
    pub fn open(detail: GroupDetail) -> (Self, DetailClosed) {
        let (tx, rx) = oneshot::channel();
        let dialog = Self {
            detail,
            selected: 0,
            body_open: false,
            body_scroll: 0,
            closed_tx: Some(tx),
        };
        (dialog, DetailClosed { rx })
    }

    /// Swap in fresh rows, keeping the selection where possible.
    pub fn update(&mut self, detail: GroupDetail) {
        self.detail = detail;
        self.selected = self.selected.min(self.detail.rows.len().saturating_sub(1));
        if self.selected_row().and_then(|r| r.body.as_ref()).is_none() {
            self.body_open = false;
        }
    }

    pub fn selected_row(&self) -> Option<&DetailRow> {
        self.detail.rows.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.detail.rows.len() {
            self.selected += 1;
            self.body_scroll = 0;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.body_scroll = 0;
        }
    }

    /// Open or close the body viewer. Rows without a body never open it.
    pub fn toggle_body(&mut self) -> bool {
        if self.body_open {
            self.body_open = false;
        } else if self.selected_row().is_some_and(|r| r.body.is_some()) {
            self.body_open = true;
            self.body_scroll = 0;
        }
        self.body_open
    }

    pub fn scroll_body(&mut self, delta: i32) {
        let max = self
            .selected_row()
            .and_then(|r| r.body.as_ref())
            .map(|b| b.line_count().saturating_sub(1))
            .unwrap_or(0)
            .min(u16::MAX as usize) as i32;
        self.body_scroll = (self.body_scroll as i32 + delta).clamp(0, max) as u16;
    }
}

impl Drop for DetailDialog {
    fn drop(&mut self) {
        if let Some(tx) = self.closed_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Size an overlay by fitting its natural size against the terminal, then
/// clamp it to the given width limits and the terminal height.
pub(crate) fn fitted_area(
    natural: BoxSize,
    area: Rect,
    target: f64,
    width_limits: (f64, f64),
) -> Rect {
    let mut element = Element::new(natural);
    let scale =
        layout::fit(&mut element, Reference::Viewport, BoxSize::from(area), target).unwrap_or(1.0);

    let min_width = (area.width as f64 * width_limits.0).floor().max(1.0);
    let max_width = (area.width as f64 * width_limits.1).floor().max(min_width);
    let width = (natural.width * scale).round().clamp(min_width, max_width) as u16;
    let height = (natural.height * scale)
        .round()
        .clamp(3.0_f64.min(area.height as f64), area.height as f64) as u16;

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Screen area of the detail dialog within the terminal `area`.
pub fn dialog_area(dialog: &DetailDialog, area: Rect) -> Rect {
    fitted_area(dialog.detail.natural_size(), area, DIALOG_FIT_TARGET, (0.5, 1.0))
}

/// Render the group detail as a modal overlay, with the body viewer on top
/// when it is open.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref dialog) = app.detail else {
        return;
    };
    let detail = &dialog.detail;
    let theme = &app.theme;

    let overlay_area = dialog_area(dialog, area);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .title(format!(" {} ", detail.title))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.highlight));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let chunks = Layout::vertical([Constraint::Min(2), Constraint::Length(1)]).split(inner);

    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Endpoint"),
        Cell::from("Code"),
        Cell::from("Time"),
        Cell::from("Took"),
        Cell::from(""),
    ])
    .style(theme.header);

    let rows: Vec<Row> = detail
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let base = if row.inactive {
                theme.inactive_style()
            } else {
                Style::default()
            };
            let style = if i == dialog.selected {
                base.patch(theme.selected)
            } else {
                base
            };
            let body_marker = if row.body_error {
                Span::styled("read error", Style::default().fg(theme.warning))
            } else if row.body.is_some() {
                Span::styled("[body]", Style::default().fg(theme.highlight))
            } else {
                Span::raw("")
            };

            Row::new(vec![
                Cell::from(Span::styled("●", theme.status_style(row.status))),
                Cell::from(row.name.clone()),
                Cell::from(row.code.clone()),
                Cell::from(row.time.clone()),
                Cell::from(row.took.clone().unwrap_or_default()),
                Cell::from(body_marker),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Fill(3),
            Constraint::Length(5),
            Constraint::Fill(1),
            Constraint::Length(7),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .column_spacing(2);
    frame.render_widget(table, chunks[0]);

    let link = dialog
        .selected_row()
        .and_then(|r| r.link.as_deref())
        .unwrap_or("");
    let footer = Line::from(vec![
        Span::styled(format!(" {} ", link), Style::default().add_modifier(Modifier::UNDERLINED)),
        Span::styled(
            " ↑↓:select Enter:body r:refresh Esc:close",
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(footer), chunks[1]);

    if dialog.body_open {
        if let Some(body) = dialog.selected_row().and_then(|r| r.body.as_ref()) {
            render_body(frame, app, body, area);
        }
    }
}

fn render_body(frame: &mut Frame, app: &App, body: &BodyView, area: Rect) {
    let Some(ref dialog) = app.detail else {
        return;
    };
    let theme = &app.theme;

    let natural = BoxSize::new(
        (body.max_line_width() + 2) as f64,
        (body.line_count() + 2) as f64,
    );
    let body_area = fitted_area(natural, area, DIALOG_FIT_TARGET, (BODY_MIN_WIDTH, BODY_MAX_WIDTH));
    frame.render_widget(Clear, body_area);

    let (label, style) = match body.kind {
        BodyKind::Json if body.formatted => ("json", Style::default()),
        BodyKind::Json => ("json, unformatted", Style::default()),
        BodyKind::Html => ("html source", Style::default().add_modifier(Modifier::DIM)),
        BodyKind::Plain => ("text", Style::default()),
    };

    let block = Block::default()
        .title(format!(" {} ", label))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border));

    let paragraph = Paragraph::new(body.text.as_str())
        .style(style)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((dialog.body_scroll, 0));
    frame.render_widget(paragraph, body_area);
}
