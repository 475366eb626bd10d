//! Backend access for the dashboard.
//!
//! The board only needs four calls from its backend: the topology, the full
//! health snapshot, a forced re-probe of everything, and a forced re-probe of
//! a single endpoint. [`StatusApi`] abstracts those so the controller can run
//! against the HTTP backend, a directory of JSON files, or a test double.

mod file;
mod http;
mod snapshot;

pub use file::FileApi;
pub use http::{HttpApi, HttpApiBuilder};
pub use snapshot::{Config, Endpoint, Group, HealthRecord, Snapshot, Status};

use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered with a non-success status code.
    #[error("Backend returned status {0}")]
    Status(u16),

    /// The response body was not the JSON we expected.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Reading a local source failed.
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),

    /// The base URL or a request path could not be built.
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status(status.as_u16())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

/// The calls the board makes against its backend.
///
/// # Example
///
/// ```no_run
/// use statusboard::{HttpApi, StatusApi};
///
/// # tokio_test::block_on(async {
/// let api = HttpApi::new("http://localhost:8765/api/").unwrap();
/// let config = api.config().await.unwrap();
/// println!("{} groups", config.groups.len());
/// # });
/// ```
#[async_trait]
pub trait StatusApi: Send + Sync + Debug {
    /// Fetch the dashboard topology (`GET config`).
    async fn config(&self) -> Result<Config, ApiError>;

    /// Fetch the latest health snapshot (`GET readAll`).
    async fn read_all(&self) -> Result<Snapshot, ApiError>;

    /// Ask the backend to re-probe everything and return the fresh snapshot
    /// (`GET refreshAll`).
    async fn refresh_all(&self) -> Result<Snapshot, ApiError>;

    /// Ask the backend to re-probe one endpoint (`GET refresh?group=&endpoint=`).
    async fn refresh_endpoint(&self, group: &str, endpoint: &str)
        -> Result<HealthRecord, ApiError>;

    /// Human-readable description of where the data comes from.
    fn description(&self) -> &str;
}
