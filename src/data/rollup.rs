//! Status rollup: per-endpoint and per-group traffic lights.
//!
//! The rollup is recomputed from scratch on every render pass. Any endpoint
//! can change independently between snapshots, so there is nothing worth
//! patching incrementally.

use reqwest::Url;

use crate::source::{Endpoint, Group, Snapshot, Status};

/// Resolved status of a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub name: String,
    /// Snapshot key this endpoint was looked up under.
    pub key: String,
    pub status: Status,
    pub inactive: bool,
}

/// How many endpoints of a group are in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub grey: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Grey => self.grey += 1,
            Status::Green => self.green += 1,
            Status::Yellow => self.yellow += 1,
            Status::Red => self.red += 1,
        }
    }

    /// Count for one status.
    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Grey => self.grey,
            Status::Green => self.green,
            Status::Yellow => self.yellow,
            Status::Red => self.red,
        }
    }

    pub fn total(&self) -> usize {
        self.grey + self.green + self.yellow + self.red
    }
}

/// Rollup of one group against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    /// One entry per endpoint, in declaration order.
    pub per_endpoint: Vec<EndpointStatus>,
    pub counts: StatusCounts,
    pub aggregate: Status,
}

/// Resolve an endpoint's URL against its group's base URL.
///
/// Returns `None` when no absolute URL can be formed (relative endpoint URL
/// without a usable group base).
pub fn resolve_endpoint_url(group: &Group, endpoint: &Endpoint) -> Option<Url> {
    match group.url.as_deref().and_then(|base| Url::parse(base).ok()) {
        Some(base) => base.join(&endpoint.url).ok(),
        None => Url::parse(&endpoint.url).ok(),
    }
}

/// The snapshot key for an endpoint.
///
/// This is the only place keys are built. When no absolute URL can be formed
/// the raw endpoint URL is used, which simply never matches and rolls up grey.
pub fn resolve_endpoint_key(group: &Group, endpoint: &Endpoint) -> String {
    resolve_endpoint_url(group, endpoint)
        .map(String::from)
        .unwrap_or_else(|| endpoint.url.clone())
}

/// Status of one endpoint in the snapshot; grey when missing or unknown.
pub fn endpoint_status(snapshot: &Snapshot, key: &str) -> Status {
    snapshot.get(key).and_then(|record| record.status).unwrap_or(Status::Grey)
}

/// Decide a group's aggregate status from its endpoint counts.
///
/// Red only once failures outnumber successes, but any red or yellow at all
/// keeps the group from showing green.
pub fn aggregate_status(group: &Group, counts: &StatusCounts) -> Status {
    if let Some(forced) = group.forced_status {
        return forced;
    }
    if group.inactive {
        return Status::Grey;
    }
    if counts.red > counts.green {
        Status::Red
    } else if counts.red > 0 || counts.yellow > 0 {
        Status::Yellow
    } else {
        Status::Green
    }
}

/// Roll up a group against a snapshot.
pub fn rollup(group: &Group, snapshot: &Snapshot) -> Rollup {
    let mut counts = StatusCounts::default();

    let per_endpoint = group
        .endpoints
        .iter()
        .map(|endpoint| {
            let key = resolve_endpoint_key(group, endpoint);
            let status = endpoint_status(snapshot, &key);
            counts.add(status);
            EndpointStatus {
                name: endpoint.name.clone(),
                key,
                status,
                inactive: endpoint.inactive,
            }
        })
        .collect();

    let aggregate = aggregate_status(group, &counts);

    Rollup {
        per_endpoint,
        counts,
        aggregate,
    }
}
