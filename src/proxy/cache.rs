//! Named response caches, optionally persisted to a JSON file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{ProxyError, ProxyResponse};

type Caches = BTreeMap<String, BTreeMap<String, ProxyResponse>>;

/// Response bodies are stored as base64 strings in the cache file.
pub(crate) mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Cache name -> (request key -> response).
///
/// Every mutation is written through to the backing file when there is one.
/// Writes go to a sibling temp file that is renamed into place, one at a time,
/// so the file always holds a complete snapshot no older than the last write.
pub struct CacheStorage {
    caches: Mutex<Caches>,
    path: Option<PathBuf>,
    writer: tokio::sync::Mutex<()>,
}

impl fmt::Debug for CacheStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStorage")
            .field("caches", &self.keys())
            .field("path", &self.path)
            .finish()
    }
}

impl CacheStorage {
    pub fn in_memory() -> Self {
        Self::with_caches(Caches::new(), None)
    }

    /// Open a file-backed storage, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProxyError> {
        let path = path.as_ref().to_path_buf();
        let caches = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let caches: Caches = serde_json::from_str(&content)?;
            info!(path = %path.display(), caches = caches.len(), "Loaded proxy cache");
            caches
        } else {
            Caches::new()
        };

        Ok(Self::with_caches(caches, Some(path)))
    }

    /// Like [`open`](Self::open), but an unreadable file starts an empty
    /// cache that replaces it on the next write.
    pub fn open_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(storage) => storage,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable proxy cache");
                Self::with_caches(Caches::new(), Some(path.to_path_buf()))
            }
        }
    }

    fn with_caches(caches: Caches, path: Option<PathBuf>) -> Self {
        Self {
            caches: Mutex::new(caches),
            path,
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Names of all caches, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.caches.lock().keys().cloned().collect()
    }

    /// Remove a cache. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> Result<bool, ProxyError> {
        let existed = self.caches.lock().remove(name).is_some();
        if existed {
            debug!(cache = name, "Deleted cache");
            self.persist().await?;
        }
        Ok(existed)
    }

    pub fn get(&self, name: &str, key: &str) -> Option<ProxyResponse> {
        self.caches.lock().get(name)?.get(key).cloned()
    }

    pub async fn put(&self, name: &str, key: &str, response: ProxyResponse) -> Result<(), ProxyError> {
        self.put_all(name, vec![(key.to_string(), response)]).await
    }

    /// Store several responses in one step, creating the cache if needed.
    pub async fn put_all(
        &self,
        name: &str,
        entries: Vec<(String, ProxyResponse)>,
    ) -> Result<(), ProxyError> {
        self.caches
            .lock()
            .entry(name.to_string())
            .or_default()
            .extend(entries);
        self.persist().await
    }

    /// Number of entries in a cache; zero if it does not exist.
    pub fn len(&self, name: &str) -> usize {
        self.caches.lock().get(name).map_or(0, BTreeMap::len)
    }

    async fn persist(&self) -> Result<(), ProxyError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        // Serialize inside the writer lock so a later snapshot is never
        // overwritten by an earlier one.
        let _writing = self.writer.lock().await;
        let content = {
            let caches = self.caches.lock();
            serde_json::to_vec(&*caches)?
        };

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn response(body: &[u8]) -> ProxyResponse {
        ProxyResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "image/png".to_string())],
            body: body.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = CacheStorage::in_memory();
        assert_eq!(storage.get("v1", "GET /"), None);

        storage.put("v1", "GET /", response(b"index")).await.unwrap();
        assert_eq!(storage.get("v1", "GET /").unwrap().body, b"index".to_vec());
        assert_eq!(storage.len("v1"), 1);
        assert_eq!(storage.len("v2"), 0);

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_persists_binary_bodies_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let bytes = [0u8, 159, 146, 150, 255];

        {
            let storage = CacheStorage::open(&path).unwrap();
            storage
                .put_all(
                    "v1",
                    vec![
                        ("GET /logo.png".to_string(), response(&bytes)),
                        ("GET /index.html".to_string(), response(b"<html>")),
                    ],
                )
                .await
                .unwrap();
            storage.put("old", "GET /", response(b"x")).await.unwrap();
            storage.delete("old").await.unwrap();
        }

        let reopened = CacheStorage::open(&path).unwrap();
        assert_eq!(reopened.keys(), vec!["v1".to_string()]);
        assert_eq!(reopened.get("v1", "GET /logo.png").unwrap().body, bytes.to_vec());
        assert_eq!(reopened.len("v1"), 2);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("PGh0bWw+"), "bodies are base64 encoded: {raw}");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(CacheStorage::open(&path), Err(ProxyError::Serde(_))));
    }

    #[tokio::test]
    async fn test_open_or_empty_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{\"v1\": {\"GET /\": trunc").unwrap();

        let storage = CacheStorage::open_or_empty(&path);
        assert!(storage.keys().is_empty());

        storage.put("v1", "GET /", response(b"index")).await.unwrap();
        let reopened = CacheStorage::open(&path).unwrap();
        assert_eq!(reopened.get("v1", "GET /").unwrap().body, b"index".to_vec());
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_all_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let storage = Arc::new(CacheStorage::open(&path).unwrap());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    let key = format!("GET /asset-{i}.js");
                    storage.put("v1", &key, response(b"js")).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let reopened = CacheStorage::open(&path).unwrap();
        assert_eq!(reopened.len("v1"), 32);
    }
}
