//! Application state and navigation logic.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use ratatui::layout::Rect;
use tokio::sync::watch;
use tracing::debug;

use crate::board::{BoardHandle, BoardPhase, BoardState};
use crate::data::{rollup, StatusCounts};
use crate::layout::{self, BoxSize, Reference, DEFAULT_FIT_TARGET};
use crate::source::{Config, Snapshot};
use crate::ui::detail::{DetailClosed, DetailDialog, GroupDetail};
use crate::ui::grid::GridLayout;
use crate::ui::{Theme, TileBoard, TileId};

/// Code the backend records when an endpoint did not answer.
pub const DEFAULT_NO_RESPONSE_CODE: i64 = 999;

/// Display options for the board.
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Response code rendered as "no response" in the detail view.
    pub no_response_code: i64,
    /// Fraction of its tile a title is fitted to.
    pub fit_target: f64,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            no_response_code: DEFAULT_NO_RESPONSE_CODE,
            fit_target: DEFAULT_FIT_TARGET,
        }
    }
}

/// Main application state.
///
/// The app never fetches anything itself. It observes [`BoardState`]s
/// published by the board controller and projects each new snapshot onto
/// the tile board.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    handle: BoardHandle,
    state_rx: watch::Receiver<BoardState>,
    /// Latest state seen from the controller.
    pub state: BoardState,
    rendered_generation: u64,

    pub title: String,
    pub tiles: TileBoard,
    /// Groups per aggregate status, from the last render pass.
    pub totals: StatusCounts,
    fit_pending: bool,

    // Navigation state
    /// Index into the tile display order.
    pub selected: usize,
    pub scroll: u16,
    /// Tiles per grid row, from the last drawn frame.
    pub columns: usize,
    /// Tile rectangles on screen, from the last drawn frame.
    pub tile_areas: Vec<(TileId, Rect)>,
    /// Terminal area of the last drawn frame.
    pub viewport: Rect,
    pub detail: Option<DetailDialog>,
    /// Close signal of the dialog opened from the UI, with its group name.
    detail_closed: Option<(String, DetailClosed)>,

    // UI
    pub theme: Theme,
    options: AppOptions,
    source_description: String,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(
        handle: BoardHandle,
        source_description: impl Into<String>,
        options: AppOptions,
        theme: Theme,
    ) -> Self {
        let state_rx = handle.subscribe();
        Self {
            running: true,
            show_help: false,
            handle,
            state_rx,
            state: BoardState::default(),
            rendered_generation: 0,
            title: String::new(),
            tiles: TileBoard::new(),
            totals: StatusCounts::default(),
            fit_pending: false,
            selected: 0,
            scroll: 0,
            columns: 1,
            tile_areas: Vec::new(),
            viewport: Rect::default(),
            detail: None,
            detail_closed: None,
            theme,
            options,
            source_description: source_description.into(),
            status_message: None,
        }
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        &self.source_description
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Pick up the controller's latest state.
    ///
    /// Runs a render pass when a new snapshot generation arrived and returns
    /// whether it did. A failed initial load stops the app.
    pub fn sync(&mut self) -> bool {
        self.watch_detail_closed();

        // A closed channel still holds the final state, e.g. a failed load.
        if !self.state_rx.has_changed().unwrap_or(true) {
            return false;
        }
        self.state = self.state_rx.borrow_and_update().clone();

        if let BoardPhase::Failed(ref err) = self.state.phase {
            debug!(error = %err, "Board failed, stopping");
            self.running = false;
            return false;
        }

        if self.state.generation != self.rendered_generation {
            self.render_pass();
            return true;
        }
        false
    }

    /// Project the current snapshot onto the tile board, every group in
    /// declaration order. Titles are fitted later, once the grid is laid out.
    fn render_pass(&mut self) {
        let Some((config, snapshot)) = self.state.data() else {
            return;
        };
        let (config, snapshot) = (Arc::clone(config), Arc::clone(snapshot));

        self.title = config.title.clone();

        let mut totals = StatusCounts::default();
        for (index, group) in config.groups.iter().enumerate() {
            let rollup = rollup(group, &snapshot);
            totals.add(rollup.aggregate);
            self.tiles.render_tile(index, group, &rollup);
        }
        self.totals = totals;
        self.rendered_generation = self.state.generation;
        self.fit_pending = true;

        let count = self.tiles.display_order().len();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }

        if let Some(ref mut dialog) = self.detail {
            let index = dialog.detail.group_index;
            if let Some(group) = config.groups.get(index) {
                dialog.update(GroupDetail::build(
                    index,
                    group,
                    &snapshot,
                    Utc::now(),
                    self.options.no_response_code,
                ));
            }
        }

        debug!(
            generation = self.rendered_generation,
            groups = config.groups.len(),
            "Render pass"
        );
    }

    pub fn fit_pending(&self) -> bool {
        self.fit_pending
    }

    /// Ask for titles to be fitted again on the next frame, e.g. after a resize.
    pub fn request_fit(&mut self) {
        self.fit_pending = true;
    }

    /// Fit every tile title against its laid-out tile.
    ///
    /// Called while drawing, after the grid for the frame is known. Does
    /// nothing unless a render pass or resize asked for it.
    pub fn fit_pass(&mut self, grid: &GridLayout, viewport: Rect) {
        if !self.fit_pending {
            return;
        }
        let viewport = BoxSize::from(viewport);
        for (id, rect) in grid.tiles() {
            let inner = BoxSize::new(
                rect.width.saturating_sub(2) as f64,
                rect.height.saturating_sub(2) as f64,
            );
            if let Some(tile) = self.tiles.tile_mut(id) {
                layout::fit(
                    &mut tile.title_element,
                    Reference::Box(inner),
                    viewport,
                    self.options.fit_target,
                );
            }
        }
        self.fit_pending = false;
    }

    /// Currently selected tile.
    pub fn selected_tile(&self) -> Option<TileId> {
        self.tiles.display_order().get(self.selected).copied()
    }

    /// Move the selection by `delta` tiles in display order.
    pub fn select_by(&mut self, delta: isize) {
        let count = self.tiles.display_order().len();
        if count == 0 {
            return;
        }
        let max = count as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }

    pub fn select_next(&mut self) {
        self.select_by(1);
    }

    pub fn select_prev(&mut self) {
        self.select_by(-1);
    }

    /// Move one grid row down.
    pub fn select_down(&mut self) {
        self.select_by(self.columns.max(1) as isize);
    }

    /// Move one grid row up.
    pub fn select_up(&mut self) {
        self.select_by(-(self.columns.max(1) as isize));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.tiles.display_order().len().saturating_sub(1);
    }

    /// Select a tile by id. Returns false if it is not displayed.
    pub fn select_tile(&mut self, id: TileId) -> bool {
        match self.tiles.display_order().iter().position(|&t| t == id) {
            Some(position) => {
                self.selected = position;
                true
            }
            None => false,
        }
    }

    /// Open the detail dialog for the selected tile's group.
    ///
    /// Returns a signal that resolves once the dialog is dismissed.
    pub fn open_detail(&mut self) -> Option<DetailClosed> {
        let tile = self.tiles.tile(self.selected_tile()?)?;
        let index = tile.activate_target();
        let (config, snapshot) = self.state.data()?;
        let group = config.groups.get(index)?;

        let detail = GroupDetail::build(
            index,
            group,
            snapshot,
            Utc::now(),
            self.options.no_response_code,
        );
        let (dialog, closed) = DetailDialog::open(detail);
        self.detail = Some(dialog);
        Some(closed)
    }

    /// Open the detail dialog from a key press or click and keep its close
    /// signal. Returns whether a dialog opened.
    pub fn show_detail(&mut self) -> bool {
        let Some(closed) = self.open_detail() else {
            return false;
        };
        let group = self
            .detail
            .as_ref()
            .map(|d| d.detail.group_name.clone())
            .unwrap_or_default();
        debug!(%group, "Opened detail");
        self.detail_closed = Some((group, closed));
        true
    }

    fn watch_detail_closed(&mut self) {
        if let Some((group, closed)) = self.detail_closed.as_mut() {
            if closed.is_closed() {
                debug!(%group, "Closed detail");
                self.detail_closed = None;
            }
        }
    }

    /// Close the body viewer if it is open, otherwise the detail dialog.
    pub fn close_overlay(&mut self) {
        if let Some(dialog) = self.detail.as_mut() {
            if dialog.body_open {
                dialog.body_open = false;
                return;
            }
        }
        self.detail = None;
    }

    /// Handle a left click at a terminal position.
    pub fn click(&mut self, column: u16, row: u16) {
        if self.detail.is_some() {
            let inside = self
                .detail
                .as_ref()
                .map(|d| crate::ui::detail::dialog_area(d, self.viewport))
                .is_some_and(|area| contains(area, column, row));
            if !inside {
                self.detail = None;
            }
            return;
        }

        let hit = self
            .tile_areas
            .iter()
            .find(|(_, area)| contains(*area, column, row))
            .map(|(id, _)| *id);
        if let Some(id) = hit {
            if self.select_tile(id) {
                self.show_detail();
            }
        }
    }

    /// Ask the backend to re-probe everything.
    pub fn refresh_all(&mut self) {
        if self.handle.refresh_all() {
            self.set_status_message("Refreshing all endpoints...".to_string());
        } else {
            self.set_status_message("Refresh already queued".to_string());
        }
    }

    /// Ask the backend to re-probe the endpoint selected in the detail view.
    pub fn refresh_selected_endpoint(&mut self) {
        let Some(dialog) = self.detail.as_ref() else {
            return;
        };
        let Some(row) = dialog.selected_row() else {
            return;
        };
        let (group, endpoint) = (dialog.detail.group_name.clone(), row.name.clone());

        if self.handle.refresh_endpoint(&group, &endpoint) {
            self.set_status_message(format!("Refreshing {} / {}...", group, endpoint));
        } else {
            self.set_status_message("Refresh already queued".to_string());
        }
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export current state to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some((config, snapshot)) = self.state.data() else {
            anyhow::bail!("No data to export");
        };
        let export = export_json(config, snapshot, self.state.last_refresh);
        std::fs::write(path, serde_json::to_string_pretty(&export)?)?;
        Ok(())
    }

    /// Give back the controller handle, e.g. to join it after the UI exits.
    pub fn into_handle(self) -> BoardHandle {
        self.handle
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

/// Summarize a board as JSON: per-status group counts plus each group's
/// aggregate and endpoint statuses.
pub fn export_json(
    config: &Config,
    snapshot: &Snapshot,
    updated: Option<DateTime<Utc>>,
) -> serde_json::Value {
    let mut totals = StatusCounts::default();

    let groups: Vec<serde_json::Value> = config
        .groups
        .iter()
        .map(|group| {
            let rollup = rollup(group, snapshot);
            totals.add(rollup.aggregate);
            serde_json::json!({
                "name": group.name,
                "category": group.category,
                "inactive": group.inactive,
                "status": rollup.aggregate,
                "endpoints": rollup.per_endpoint.iter().map(|e| {
                    serde_json::json!({
                        "name": e.name,
                        "key": e.key,
                        "status": e.status,
                        "inactive": e.inactive,
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "title": config.title,
        "updated": updated.map(|t| t.to_rfc3339()),
        "summary": {
            "total_groups": totals.total(),
            "green": totals.green,
            "yellow": totals.yellow,
            "red": totals.red,
            "grey": totals.grey,
        },
        "groups": groups,
    })
}
