//! Terminal UI rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`tiles`]: the tile model, one tile per group, updated in place
//! - [`grid`]: layout and drawing of the tile grid, title projection
//! - [`detail`]: group detail overlay and body viewer
//! - [`common`]: shared components (header, status bar, help overlay)
//! - [`theme`]: light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ ── category ───────────────────────  │
//! │ ┌──────┐ ┌──────┐ ┌──────┐           │
//! │ │ tile │ │ tile │ │ tile │  (grid)   │
//! │ └──────┘ └──────┘ └──────┘           │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//! ```
//!
//! Tile titles are fitted against their tile only after the grid has been
//! laid out for the frame; see [`crate::app::App::fit_pass`].

pub mod common;
pub mod detail;
pub mod grid;
pub mod theme;
pub mod tiles;

pub use theme::Theme;
pub use tiles::{TileBoard, TileId};
