//! Tile model: one tile per group, kept in an arena and updated in place.
//!
//! Tiles are identified by their sanitized group name and addressed by
//! [`TileId`] (an index into the arena), so the board never has to search a
//! shared namespace to find a tile. A render pass calls
//! [`TileBoard::render_tile`] once per group; calling it again with the same
//! data leaves the board unchanged.

use std::collections::HashMap;

use crate::data::Rollup;
use crate::layout::{BoxSize, Element};
use crate::source::{Group, Status};

/// Index of a tile in the arena.
pub type TileId = usize;

/// Which top-level container a tile lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Active,
    Inactive,
}

/// One endpoint indicator on a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dot {
    pub status: Status,
    /// Tooltip text, e.g. `"health status: green"`.
    pub title: String,
}

/// A group's tile.
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    pub key: String,
    pub title: String,
    /// Group opened when the tile is activated. Bound once at creation.
    activate_group: usize,
    status: Option<Status>,
    inactive: bool,
    dots: Vec<Dot>,
    /// Title element, fitted against the tile after layout.
    pub title_element: Element,
    section: Option<usize>,
}

impl Tile {
    fn new(id: TileId, key: String, group_index: usize, group: &Group) -> Self {
        let width = group.name.chars().count().max(1) as f64;
        Self {
            id,
            key,
            title: group.name.clone(),
            activate_group: group_index,
            status: None,
            inactive: false,
            dots: Vec::new(),
            title_element: Element::new(BoxSize::new(width, 1.0)),
            section: None,
        }
    }

    /// Index of the group this tile opens.
    pub fn activate_target(&self) -> usize {
        self.activate_group
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn is_inactive(&self) -> bool {
        self.inactive
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    /// Apply a status class, dropping whichever status was set before.
    fn set_status(&mut self, status: Status) {
        self.status = Some(status);
    }

    /// Class names currently applied, in a stable order.
    pub fn class_list(&self) -> Vec<&'static str> {
        let mut classes = vec!["tile"];
        if self.inactive {
            classes.push("inactive");
        }
        if let Some(status) = self.status {
            classes.push(status.class_name());
        }
        classes
    }
}

/// A per-category sub-container inside the active or inactive container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub activity: Activity,
    pub category: String,
    tiles: Vec<TileId>,
}

impl Section {
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// All tiles of the board plus their placement.
#[derive(Debug, Default)]
pub struct TileBoard {
    tiles: Vec<Tile>,
    by_key: HashMap<String, TileId>,
    /// Sections in creation order.
    sections: Vec<Section>,
}

impl TileBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tile identity for a group: every character outside `[A-Za-z0-9_]` is
    /// replaced by `_`. Groups whose names collide share a tile.
    pub fn tile_key(name: &str) -> String {
        name.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }

    /// Create or update the tile for a group from its rollup.
    pub fn render_tile(&mut self, group_index: usize, group: &Group, rollup: &Rollup) -> TileId {
        let id = self.get_or_create(group_index, group);

        let activity = if group.inactive {
            Activity::Inactive
        } else {
            Activity::Active
        };
        let section = self.section_for(activity, &group.category);
        self.place(id, section);

        let tile = &mut self.tiles[id];
        tile.inactive = group.inactive;

        tile.dots.clear();
        tile.dots.extend(rollup.per_endpoint.iter().map(|endpoint| Dot {
            status: endpoint.status,
            title: format!("{} status: {}", endpoint.name, endpoint.status),
        }));

        tile.set_status(rollup.aggregate);
        id
    }

    fn get_or_create(&mut self, group_index: usize, group: &Group) -> TileId {
        let key = Self::tile_key(&group.name);
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }

        let id = self.tiles.len();
        self.tiles.push(Tile::new(id, key.clone(), group_index, group));
        self.by_key.insert(key, id);
        id
    }

    fn section_for(&mut self, activity: Activity, category: &str) -> usize {
        if let Some(index) = self
            .sections
            .iter()
            .position(|s| s.activity == activity && s.category == category)
        {
            return index;
        }

        self.sections.push(Section {
            activity,
            category: category.to_string(),
            tiles: Vec::new(),
        });
        self.sections.len() - 1
    }

    /// Move a tile into a section. A tile already in that section stays put.
    fn place(&mut self, id: TileId, section: usize) {
        let current = self.tiles[id].section;
        if current == Some(section) {
            return;
        }
        if let Some(old) = current {
            self.sections[old].tiles.retain(|&t| t != id);
        }
        self.sections[section].tiles.push(id);
        self.tiles[id].section = Some(section);
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id)
    }

    pub fn tile_by_key(&self, key: &str) -> Option<&Tile> {
        self.by_key.get(key).and_then(|&id| self.tiles.get(id))
    }

    /// Non-empty sections of one container, in creation order.
    pub fn sections(&self, activity: Activity) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .filter(move |s| s.activity == activity && !s.is_empty())
    }

    /// Tiles in display order: active container first, then inactive.
    pub fn display_order(&self) -> Vec<TileId> {
        self.sections(Activity::Active)
            .chain(self.sections(Activity::Inactive))
            .flat_map(|s| s.tiles.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rollup;
    use crate::source::{Endpoint, HealthRecord, Snapshot};

    fn group(name: &str, category: &str, inactive: bool) -> Group {
        Group {
            name: name.to_string(),
            category: category.to_string(),
            url: Some("https://svc.example.com/".to_string()),
            inactive,
            forced_status: None,
            endpoints: vec![
                Endpoint {
                    name: "health".to_string(),
                    url: "health".to_string(),
                    inactive: false,
                },
                Endpoint {
                    name: "ready".to_string(),
                    url: "ready".to_string(),
                    inactive: false,
                },
            ],
        }
    }

    fn snapshot(health: Status) -> Snapshot {
        let mut s = Snapshot::new();
        s.insert(
            "https://svc.example.com/health".to_string(),
            HealthRecord {
                status: Some(health),
                ..HealthRecord::default()
            },
        );
        s
    }

    fn render_all(board: &mut TileBoard, groups: &[Group], snapshot: &Snapshot) {
        for (i, g) in groups.iter().enumerate() {
            board.render_tile(i, g, &rollup(g, snapshot));
        }
    }

    #[test]
    fn test_tile_key_sanitizes() {
        assert_eq!(TileBoard::tile_key("Auth API (eu-1)"), "Auth_API__eu_1_");
        assert_eq!(TileBoard::tile_key("snake_case9"), "snake_case9");
    }

    #[test]
    fn test_render_twice_is_idempotent() {
        let groups = vec![
            group("Auth", "core", false),
            group("Billing", "core", false),
            group("Legacy", "old", true),
        ];
        let s = snapshot(Status::Green);

        let mut board = TileBoard::new();
        render_all(&mut board, &groups, &s);
        let first: Vec<_> = board
            .display_order()
            .iter()
            .map(|&id| board.tile(id).unwrap().class_list())
            .collect();

        render_all(&mut board, &groups, &s);
        let second: Vec<_> = board
            .display_order()
            .iter()
            .map(|&id| board.tile(id).unwrap().class_list())
            .collect();

        assert_eq!(board.len(), 3);
        assert_eq!(board.display_order().len(), 3);
        assert_eq!(first, second);
        assert_eq!(board.tile(0).unwrap().dots().len(), 2);
    }

    #[test]
    fn test_status_class_is_replaced() {
        let groups = vec![group("Auth", "core", false)];
        let mut board = TileBoard::new();

        // One red, one missing (grey): red outnumbers green.
        render_all(&mut board, &groups, &snapshot(Status::Red));
        assert!(board.tile(0).unwrap().class_list().contains(&"status_red"));

        let mut all_green = snapshot(Status::Green);
        all_green.insert(
            "https://svc.example.com/ready".to_string(),
            HealthRecord {
                status: Some(Status::Green),
                ..HealthRecord::default()
            },
        );
        render_all(&mut board, &groups, &all_green);

        let classes = board.tile(0).unwrap().class_list();
        assert_eq!(classes, vec!["tile", "status_green"]);
    }

    #[test]
    fn test_dots_are_rebuilt() {
        let groups = vec![group("Auth", "core", false)];
        let mut board = TileBoard::new();
        render_all(&mut board, &groups, &snapshot(Status::Red));
        render_all(&mut board, &groups, &snapshot(Status::Red));

        let dots = board.tile(0).unwrap().dots();
        assert_eq!(dots.len(), 2);
        assert_eq!(dots[0].title, "health status: red");
        assert_eq!(dots[1].status, Status::Grey);
    }

    #[test]
    fn test_sections_by_activity_and_category() {
        let groups = vec![
            group("Auth", "core", false),
            group("Docs", "web", false),
            group("Billing", "core", false),
            group("Legacy", "core", true),
        ];
        let mut board = TileBoard::new();
        render_all(&mut board, &groups, &Snapshot::new());

        let active: Vec<_> = board.sections(Activity::Active).map(|s| s.category.clone()).collect();
        assert_eq!(active, vec!["core", "web"]);
        assert_eq!(board.sections(Activity::Inactive).count(), 1);

        // Declaration order within a section, active container before inactive.
        assert_eq!(board.display_order(), vec![0, 2, 1, 3]);

        let legacy = board.tile_by_key("Legacy").unwrap();
        assert!(legacy.is_inactive());
        assert_eq!(legacy.class_list(), vec!["tile", "inactive", "status_grey"]);
    }

    #[test]
    fn test_tile_moves_when_group_becomes_inactive() {
        let mut groups = vec![group("Auth", "core", false)];
        let mut board = TileBoard::new();
        render_all(&mut board, &groups, &Snapshot::new());

        groups[0].inactive = true;
        render_all(&mut board, &groups, &Snapshot::new());

        assert_eq!(board.len(), 1);
        assert_eq!(board.sections(Activity::Active).count(), 0);
        let inactive: Vec<_> = board.sections(Activity::Inactive).collect();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].tiles(), &[0]);
    }

    #[test]
    fn test_activation_target_bound_at_creation() {
        let groups = vec![group("Auth", "core", false), group("Auth!", "core", false)];
        let mut board = TileBoard::new();
        render_all(&mut board, &groups, &Snapshot::new());

        // "Auth!" sanitizes to "Auth_", a distinct key; both get tiles.
        assert_eq!(board.len(), 2);
        assert_eq!(board.tile(1).unwrap().activate_target(), 1);

        // A colliding name reuses the first tile and keeps its binding.
        let colliding = group("Auth?", "core", false);
        let id = board.render_tile(5, &colliding, &rollup(&colliding, &Snapshot::new()));
        assert_eq!(id, 1);
        assert_eq!(board.tile(id).unwrap().activate_target(), 1);
    }
}
