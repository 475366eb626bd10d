//! Wire types shared with the status backend.
//!
//! These types match the JSON served by the backend's `config` and `readAll`
//! endpoints. Deserialization is deliberately lenient: the backend omits empty
//! fields and may report statuses the dashboard does not know about, and none
//! of that should stop the board from rendering.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Traffic-light status of an endpoint or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Unknown, inactive or not yet probed.
    Grey,
    Green,
    Yellow,
    Red,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Grey, Status::Green, Status::Yellow, Status::Red];

    /// Parse a backend status string. Empty and unrecognized values are `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grey" | "gray" => Some(Status::Grey),
            "green" => Some(Status::Green),
            "yellow" => Some(Status::Yellow),
            "red" => Some(Status::Red),
            _ => None,
        }
    }

    /// Lowercase name as used on the wire and in class names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Grey => "grey",
            Status::Green => "green",
            Status::Yellow => "yellow",
            Status::Red => "red",
        }
    }

    /// Class name applied to tiles and dots (`status_green`, ...).
    pub fn class_name(&self) -> &'static str {
        match self {
            Status::Grey => "status_grey",
            Status::Green => "status_green",
            Status::Yellow => "status_yellow",
            Status::Red => "status_red",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard topology, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub title: String,

    /// Backend probe interval in seconds.
    #[serde(default, alias = "refresh_interval_seconds", alias = "refreshInterval")]
    pub refresh_interval: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<Group>,
}

/// A named collection of monitored endpoints, rendered as one tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,

    #[serde(default)]
    pub category: String,

    /// Base URL that relative endpoint URLs are resolved against.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub inactive: bool,

    /// Operator override for the group status.
    #[serde(default, deserialize_with = "lenient_status")]
    pub forced_status: Option<Status>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub endpoints: Vec<Endpoint>,
}

/// One monitored URL within a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,

    /// Absolute URL, or a URL relative to the group's base URL.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub inactive: bool,
}

/// Latest probe result for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// `None` when the backend sent no status or one we don't recognize.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<Status>,

    /// HTTP status code of the probe; 999 means no response at all.
    #[serde(default)]
    pub code: i64,

    /// RFC 3339 timestamp of the last probe, kept raw so a bad value only
    /// affects its own cell.
    #[serde(default)]
    pub updated: Option<String>,

    #[serde(default)]
    pub content_type: String,

    /// Base64-encoded response body.
    #[serde(default)]
    pub body: Option<String>,

    /// Probe duration in seconds.
    #[serde(default)]
    pub request_duration: Option<f64>,
}

/// Health records keyed by resolved endpoint URL.
pub type Snapshot = BTreeMap<String, HealthRecord>;

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Status::parse))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
