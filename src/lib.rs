//! # statusboard
//!
//! A terminal dashboard and caching proxy for an endpoint health monitor.
//!
//! The backend probes groups of HTTP endpoints and serves their latest
//! results as JSON. This crate polls that backend and draws one tile per
//! group, colored by the group's worst endpoint, with a drill-down view per
//! group. It also ships a small reverse proxy that keeps the backend's web
//! shell available from a local cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐  watch   ┌─────────┐    ┌─────────┐   ┌────────┐ │
//! │  │  board  │─────────▶│   app   │───▶│   ui    │──▶│Terminal│ │
//! │  │(polling)│◀─────────│ (state) │    │(render) │   │        │ │
//! │  └────┬────┘ commands └─────────┘    └─────────┘   └────────┘ │
//! │       │                    │                                 │
//! │       ▼                    ▼                                 │
//! │  ┌─────────┐          ┌─────────┐                            │
//! │  │ source  │          │  data   │  rollups, relative times   │
//! │  │  (API)  │          └─────────┘                            │
//! │  └─────────┘◀── HttpApi | FileApi                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the backend calls ([`StatusApi`] trait) over HTTP or a
//!   directory of JSON files
//! - **[`board`]**: the refresh controller; loads, polls at half the
//!   backend's interval and publishes [`BoardState`]s
//! - **[`data`]**: status rollups, relative times, body decoding
//! - **[`layout`]**: scale-to-fit geometry for tile titles and dialogs
//! - **[`app`]** and **[`ui`]**: navigation state and ratatui rendering
//! - **[`proxy`]**: the cache-first reverse proxy
//! - **[`settings`]**: layered file and environment configuration
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a running backend
//! statusboard --api http://localhost:8765/api/
//!
//! # Browse saved responses (config.json + readAll.json)
//! statusboard --dir ./fixtures
//!
//! # Serve the web shell through the cache
//! statusboard proxy --listen 127.0.0.1:8080 --upstream http://localhost:8765
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use statusboard::{App, AppOptions, Board, BoardOptions, FileApi, Theme};
//!
//! # tokio_test::block_on(async {
//! let api = Arc::new(FileApi::new("fixtures"));
//! let handle = Board::spawn(api, BoardOptions::default());
//! let mut app = App::new(handle, "fixtures", AppOptions::default(), Theme::dark());
//!
//! // Call sync() before each frame to pick up new snapshots.
//! app.sync();
//! # });
//! ```
//!
//! ### Watching board states directly
//!
//! ```no_run
//! use std::sync::Arc;
//! use statusboard::{Board, BoardOptions, HttpApi};
//!
//! # tokio_test::block_on(async {
//! let api = Arc::new(HttpApi::new("http://localhost:8765/api/").unwrap());
//! let handle = Board::spawn(api, BoardOptions::default());
//! let mut states = handle.subscribe();
//! while states.changed().await.is_ok() {
//!     let state = states.borrow().clone();
//!     println!("{} (generation {})", state.phase.label(), state.generation);
//! }
//! # });
//! ```

pub mod app;
pub mod board;
pub mod data;
pub mod events;
pub mod layout;
pub mod proxy;
pub mod settings;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, AppOptions};
pub use board::{Board, BoardCommand, BoardHandle, BoardOptions, BoardPhase, BoardState};
pub use data::{EndpointStatus, Rollup, StatusCounts};
pub use proxy::{CacheProxy, CacheStorage, HttpUpstream, ProxyError, Upstream};
pub use settings::Settings;
pub use source::{
    ApiError, Config, Endpoint, FileApi, Group, HealthRecord, HttpApi, Snapshot, Status, StatusApi,
};
pub use ui::Theme;
