//! Tile grid: lays the tile board out in the terminal and draws it.
//!
//! The layout is computed in board coordinates (y grows down from the top of
//! the first section) and then shifted by the scroll offset into the content
//! area. Only fully visible items are drawn.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::tiles::{Activity, Tile, TileBoard, TileId};

/// Minimum tile width; tiles stretch to fill the row.
pub const TILE_WIDTH: u16 = 24;
/// Tile height including borders.
pub const TILE_HEIGHT: u16 = 5;

/// A laid-out grid item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridItem {
    /// Category divider line above a section.
    Divider { label: String },
    Tile(TileId),
}

/// Positions of every divider and tile in board coordinates.
#[derive(Debug, Clone, Default)]
pub struct GridLayout {
    pub items: Vec<(GridItem, Rect)>,
    /// Tiles per row.
    pub columns: usize,
    /// Total height of the board.
    pub height: u16,
}

impl GridLayout {
    pub fn compute(board: &TileBoard, width: u16) -> Self {
        let columns = (width / TILE_WIDTH).max(1);
        let tile_width = (width / columns).max(1);

        let mut items = Vec::new();
        let mut y: u16 = 0;

        for activity in [Activity::Active, Activity::Inactive] {
            for section in board.sections(activity) {
                let mut label = if section.category.is_empty() {
                    "uncategorized".to_string()
                } else {
                    section.category.clone()
                };
                if activity == Activity::Inactive {
                    label.push_str(" (inactive)");
                }
                items.push((GridItem::Divider { label }, Rect::new(0, y, width, 1)));
                y = y.saturating_add(1);

                for (i, &id) in section.tiles().iter().enumerate() {
                    let col = (i % columns as usize) as u16;
                    let row = (i / columns as usize) as u16;
                    let rect = Rect::new(
                        col * tile_width,
                        y.saturating_add(row.saturating_mul(TILE_HEIGHT)),
                        tile_width,
                        TILE_HEIGHT,
                    );
                    items.push((GridItem::Tile(id), rect));
                }

                let rows = section.tiles().len().div_ceil(columns as usize) as u16;
                y = y.saturating_add(rows.saturating_mul(TILE_HEIGHT));
            }
        }

        Self {
            items,
            columns: columns as usize,
            height: y,
        }
    }

    pub fn tile_rect(&self, id: TileId) -> Option<Rect> {
        self.items.iter().find_map(|(item, rect)| match item {
            GridItem::Tile(t) if *t == id => Some(*rect),
            _ => None,
        })
    }

    /// Tile rectangles in board coordinates.
    pub fn tiles(&self) -> impl Iterator<Item = (TileId, Rect)> + '_ {
        self.items.iter().filter_map(|(item, rect)| match item {
            GridItem::Tile(id) => Some((*id, *rect)),
            _ => None,
        })
    }

    /// Items fully inside the viewport, translated into `area`.
    pub fn visible(&self, area: Rect, scroll: u16) -> Vec<(GridItem, Rect)> {
        let bottom = scroll.saturating_add(area.height);
        self.items
            .iter()
            .filter(|(_, rect)| rect.y >= scroll && rect.y.saturating_add(rect.height) <= bottom)
            .map(|(item, rect)| {
                let shifted = Rect::new(
                    area.x + rect.x.min(area.width),
                    area.y + (rect.y - scroll),
                    rect.width.min(area.width.saturating_sub(rect.x)),
                    rect.height,
                );
                (item.clone(), shifted)
            })
            .collect()
    }
}

/// Scroll offset that keeps `rect` (board coordinates) on screen.
pub fn scroll_to_show(scroll: u16, rect: Rect, viewport_height: u16) -> u16 {
    if rect.y < scroll {
        // Keep the divider above the first row visible.
        rect.y.saturating_sub(1)
    } else if rect.y.saturating_add(rect.height) > scroll.saturating_add(viewport_height) {
        rect.y.saturating_add(rect.height).saturating_sub(viewport_height)
    } else {
        scroll
    }
}

/// Project a fitted title scale onto a terminal line of `width` cells.
///
/// A scale of 2 or more is drawn letter-spaced and bold when it fits; a scale
/// below 1 shrinks the title to that fraction of its length. Anything still
/// too wide is truncated with an ellipsis. Returns the text and whether it is
/// drawn bold.
pub fn project_title(title: &str, scale: f64, width: usize) -> (String, bool) {
    let len = title.chars().count();

    if scale >= 2.0 {
        let spaced = title.chars().map(String::from).collect::<Vec<_>>().join(" ");
        if spaced.chars().count() <= width {
            return (spaced, true);
        }
        return (truncate(title, width), true);
    }

    if scale < 1.0 {
        let keep = ((len as f64) * scale).floor().max(1.0) as usize;
        return (truncate(title, keep.min(width)), false);
    }

    (truncate(title, width), false)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Draw the visible part of the grid.
pub fn render(frame: &mut Frame, app: &App, visible: &[(GridItem, Rect)]) {
    let selected = app.selected_tile();

    for (item, rect) in visible {
        match item {
            GridItem::Divider { label } => {
                let fill = (rect.width as usize).saturating_sub(label.chars().count() + 4);
                let line = Line::from(vec![
                    Span::styled("── ", app.theme.divider),
                    Span::styled(label.clone(), app.theme.divider.add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" {}", "─".repeat(fill)), app.theme.divider),
                ]);
                frame.render_widget(Paragraph::new(line), *rect);
            }
            GridItem::Tile(id) => {
                if let Some(tile) = app.tiles.tile(*id) {
                    render_tile(frame, app, tile, *rect, selected == Some(*id));
                }
            }
        }
    }
}

fn render_tile(frame: &mut Frame, app: &App, tile: &Tile, rect: Rect, selected: bool) {
    let theme = &app.theme;
    let status_color = tile.status().map(|s| theme.status_color(s)).unwrap_or(theme.border);

    let mut border_style = if tile.is_inactive() {
        theme.inactive_style()
    } else {
        Style::default().fg(status_color)
    };
    if selected {
        border_style = border_style.add_modifier(Modifier::BOLD);
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if selected {
            theme.selected_border_type
        } else {
            theme.border_type
        })
        .border_style(border_style);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let (title, bold) = project_title(&tile.title, tile.title_element.scale(), inner.width as usize);
    let mut title_style = Style::default().fg(status_color);
    if bold {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    if tile.is_inactive() {
        title_style = theme.inactive_style();
    }

    let max_dots = (inner.width as usize / 2).max(1);
    let dots: Vec<Span> = tile
        .dots()
        .iter()
        .take(max_dots)
        .flat_map(|dot| [Span::styled("●", theme.status_style(dot.status)), Span::raw(" ")])
        .collect();

    let lines = vec![
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(dots),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rollup;
    use crate::source::{Group, Snapshot};

    fn board(groups: &[(&str, &str, bool)]) -> TileBoard {
        let mut board = TileBoard::new();
        for (i, (name, category, inactive)) in groups.iter().enumerate() {
            let group = Group {
                name: name.to_string(),
                category: category.to_string(),
                inactive: *inactive,
                ..Group::default()
            };
            board.render_tile(i, &group, &rollup(&group, &Snapshot::new()));
        }
        board
    }

    #[test]
    fn test_layout_sections_and_rows() {
        let b = board(&[
            ("a", "core", false),
            ("b", "core", false),
            ("c", "core", false),
            ("d", "web", false),
            ("e", "core", true),
        ]);
        let grid = GridLayout::compute(&b, 50);
        assert_eq!(grid.columns, 2);

        // core: divider at 0, two rows of tiles
        assert_eq!(grid.tile_rect(0), Some(Rect::new(0, 1, 25, TILE_HEIGHT)));
        assert_eq!(grid.tile_rect(1), Some(Rect::new(25, 1, 25, TILE_HEIGHT)));
        assert_eq!(grid.tile_rect(2), Some(Rect::new(0, 6, 25, TILE_HEIGHT)));
        // web: divider at 11
        assert_eq!(grid.tile_rect(3), Some(Rect::new(0, 12, 25, TILE_HEIGHT)));
        // inactive core: divider at 17
        assert_eq!(grid.tile_rect(4), Some(Rect::new(0, 18, 25, TILE_HEIGHT)));
        assert_eq!(grid.height, 23);

        let labels: Vec<_> = grid
            .items
            .iter()
            .filter_map(|(item, _)| match item {
                GridItem::Divider { label } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["core", "web", "core (inactive)"]);
    }

    #[test]
    fn test_narrow_terminal_has_one_column() {
        let b = board(&[("a", "", false), ("b", "", false)]);
        let grid = GridLayout::compute(&b, 10);
        assert_eq!(grid.columns, 1);
        assert_eq!(grid.tile_rect(1).unwrap().y, 1 + TILE_HEIGHT);
    }

    #[test]
    fn test_visible_clips_and_shifts() {
        let b = board(&[("a", "", false), ("b", "", false), ("c", "", false)]);
        let grid = GridLayout::compute(&b, 24);
        let area = Rect::new(0, 2, 24, 10);

        let visible = grid.visible(area, 6);
        let tiles: Vec<_> = visible
            .iter()
            .filter_map(|(item, rect)| match item {
                GridItem::Tile(id) => Some((*id, rect.y)),
                _ => None,
            })
            .collect();
        // Tile 1 sits at board y 6, tile 2 at 11 (ends at 16 = 6 + 10).
        assert_eq!(tiles, vec![(1, 2), (2, 7)]);
    }

    #[test]
    fn test_scroll_to_show() {
        let rect = Rect::new(0, 20, 24, TILE_HEIGHT);
        assert_eq!(scroll_to_show(0, rect, 10), 15);
        assert_eq!(scroll_to_show(30, rect, 10), 19);
        assert_eq!(scroll_to_show(18, rect, 10), 18);
    }

    #[test]
    fn test_project_title() {
        assert_eq!(project_title("Auth", 2.7, 20), ("A u t h".to_string(), true));
        // Too wide to letter-space: plain bold.
        assert_eq!(project_title("Authentication", 2.7, 20), ("Authentication".to_string(), true));
        assert_eq!(project_title("Auth", 1.2, 20), ("Auth".to_string(), false));
        assert_eq!(project_title("Authentication", 0.5, 20), ("Authen…".to_string(), false));
        assert_eq!(project_title("Authentication", 1.0, 6), ("Authe…".to_string(), false));
    }
}
