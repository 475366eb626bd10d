//! Data processing for backend snapshots.
//!
//! This module turns raw backend data into what the board displays.
//!
//! ## Submodules
//!
//! - [`rollup`]: per-endpoint and per-group status ([`Rollup`], [`rollup()`])
//! - [`reltime`]: relative time phrases for probe timestamps
//! - [`body`]: decoding of captured response bodies for the body viewer
//! - [`duration`]: parsing of interval settings ("30s", "500ms")
//!
//! ## Data Flow
//!
//! ```text
//! Config + Snapshot (raw JSON)
//!        │
//!        ▼
//! rollup(group, snapshot)      (every render pass, every group)
//!        │
//!        ├──▶ EndpointStatus   (dots on the tile, rows in the detail view)
//!        │
//!        └──▶ aggregate Status (tile color)
//! ```

pub mod body;
pub mod duration;
pub mod reltime;
pub mod rollup;

pub use body::{BodyKind, BodyView};
pub use reltime::{format_relative, format_relative_str, UNKNOWN_TIME};
pub use rollup::{
    aggregate_status, endpoint_status, resolve_endpoint_key, resolve_endpoint_url, rollup,
    EndpointStatus, Rollup, StatusCounts,
};
