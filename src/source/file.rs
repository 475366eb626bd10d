//! Directory-backed backend.
//!
//! Reads `config.json` and `readAll.json` from a directory. Useful for
//! looking at a saved backend dump without network access, and for driving
//! the board in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{ApiError, Config, HealthRecord, Snapshot, StatusApi};

/// File name holding the topology.
pub const CONFIG_FILE: &str = "config.json";
/// File name holding the health snapshot.
pub const SNAPSHOT_FILE: &str = "readAll.json";

/// A backend that serves JSON dumps from a directory.
///
/// Every call re-reads the files, so replacing `readAll.json` on disk is
/// picked up by the next refresh. There is no prober behind it: the refresh
/// calls simply re-read what is on disk.
#[derive(Debug)]
pub struct FileApi {
    dir: PathBuf,
    description: String,
}

impl FileApi {
    /// Create a file backend rooted at the given directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let description = format!("dir: {}", dir.display());
        Self { dir, description }
    }

    /// Returns the directory being read.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        let content = tokio::fs::read(self.dir.join(name)).await?;
        Ok(serde_json::from_slice(&content)?)
    }
}

#[async_trait]
impl StatusApi for FileApi {
    async fn config(&self) -> Result<Config, ApiError> {
        self.read_json(CONFIG_FILE).await
    }

    async fn read_all(&self) -> Result<Snapshot, ApiError> {
        self.read_json(SNAPSHOT_FILE).await
    }

    async fn refresh_all(&self) -> Result<Snapshot, ApiError> {
        self.read_all().await
    }

    async fn refresh_endpoint(
        &self,
        group: &str,
        endpoint: &str,
    ) -> Result<HealthRecord, ApiError> {
        let config = self.config().await?;
        let snapshot = self.read_all().await?;

        config
            .groups
            .iter()
            .find(|g| g.name == group)
            .and_then(|g| {
                let e = g.endpoints.iter().find(|e| e.name == endpoint)?;
                snapshot.get(&crate::data::resolve_endpoint_key(g, e)).cloned()
            })
            .ok_or(ApiError::Status(400))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
