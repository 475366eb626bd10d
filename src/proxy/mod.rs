//! Caching reverse proxy for the dashboard's static shell.
//!
//! Sits in front of the backend's web server. Static assets are answered
//! cache-first so the dashboard shell still loads when the backend is
//! unreachable; API traffic always goes to the network.
//!
//! ```text
//!   browser ──▶ server (hyper) ──▶ CacheProxy::handle
//!                                     │
//!                  ┌──────────────────┼───────────────────┐
//!                  ▼                  ▼                   ▼
//!             CacheFirst            Live             Passthrough
//!           (static GET)      (API GET/HEAD)       (everything else)
//!            │       │               │                   │
//!          hit?    miss ───────▶ Upstream ◀──────────────┘
//!            │       │
//!      CacheStorage ◀┘ (2xx only)
//! ```

mod cache;
mod server;
mod upstream;

pub use cache::CacheStorage;
pub use server::{serve, serve_listener};
pub use upstream::{HttpUpstream, Upstream};

use std::sync::Arc;

use hyper::body::Bytes;
use hyper::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::settings::ProxySettings;

/// Errors from the proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream could not be reached or the request could not be built.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    /// A shell asset could not be cached.
    #[error("Install failed for {path}: {reason}")]
    Install { path: String, reason: String },

    /// Reading or writing the cache file failed.
    #[error("Cache file error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache file is not valid JSON.
    #[error("Cache file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    /// The listen address is invalid.
    #[error("Invalid listen address: {0}")]
    Addr(String),
}

/// A request as seen by the proxy.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path and query, e.g. `/api/readAll`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProxyRequest {
    /// A bodiless GET, as issued for shell assets.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Key the response to this request is cached under.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A response as stored in the cache and sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(with = "cache::base64_body")]
    pub body: Vec<u8>,
}

impl ProxyResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Serve from the cache, fill it from the network on a miss.
    CacheFirst,
    /// API reads: always from the network, never cached.
    Live,
    /// Forwarded untouched.
    Passthrough,
}

/// Intercepts requests and answers static ones from a versioned cache.
#[derive(Debug)]
pub struct CacheProxy {
    version: String,
    api_prefix: String,
    assets: Vec<String>,
    storage: Arc<CacheStorage>,
    upstream: Arc<dyn Upstream>,
}

impl CacheProxy {
    pub fn new(
        settings: &ProxySettings,
        storage: Arc<CacheStorage>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            version: settings.version.clone(),
            api_prefix: settings.api_prefix.clone(),
            assets: settings.assets.clone(),
            storage,
            upstream,
        }
    }

    /// Name of the cache this proxy reads and fills.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Cache every shell asset under the current version.
    ///
    /// All or nothing: if any asset fails, nothing is stored. Older versions
    /// are left alone. Returns the number of assets cached.
    pub async fn install(&self) -> Result<usize, ProxyError> {
        let entries = self.fetch_shell().await?;
        let count = entries.len();
        self.storage.put_all(&self.version, entries).await?;
        info!(version = %self.version, assets = count, "Installed shell assets");
        Ok(count)
    }

    /// Delete every cache, whatever its name. Returns how many were removed.
    pub async fn activate(&self) -> Result<usize, ProxyError> {
        let mut removed = 0;
        for name in self.storage.keys() {
            if self.storage.delete(&name).await? {
                removed += 1;
            }
        }
        info!(removed, "Cleared caches");
        Ok(removed)
    }

    /// Startup: fetch the shell, then reset all caches and store it under the
    /// current version.
    ///
    /// When the shell cannot be fetched the existing caches are kept, so a
    /// proxy started while the backend is down still serves the last shell.
    pub async fn start(&self) -> Result<usize, ProxyError> {
        let entries = self.fetch_shell().await?;
        let count = entries.len();
        self.activate().await?;
        self.storage.put_all(&self.version, entries).await?;
        info!(version = %self.version, assets = count, "Proxy cache ready");
        Ok(count)
    }

    async fn fetch_shell(&self) -> Result<Vec<(String, ProxyResponse)>, ProxyError> {
        let mut entries = Vec::with_capacity(self.assets.len());
        for path in &self.assets {
            let request = ProxyRequest::get(path.as_str());
            let response =
                self.upstream
                    .fetch(&request)
                    .await
                    .map_err(|e| ProxyError::Install {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
            if !response.is_success() {
                return Err(ProxyError::Install {
                    path: path.clone(),
                    reason: format!("status {}", response.status),
                });
            }
            entries.push((request.cache_key(), response));
        }
        Ok(entries)
    }

    /// Decide how a request is answered.
    pub fn route(&self, method: &Method, path: &str) -> Route {
        let is_api = path.starts_with(&self.api_prefix);
        match (is_api, method) {
            (true, &Method::GET) | (true, &Method::HEAD) => Route::Live,
            (true, _) => Route::Passthrough,
            (false, &Method::GET) => Route::CacheFirst,
            (false, _) => Route::Passthrough,
        }
    }

    /// Answer a request.
    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let route = self.route(&request.method, &request.path);
        debug!(method = %request.method, path = %request.path, ?route, "Proxy request");

        match route {
            Route::CacheFirst => {
                let key = request.cache_key();
                if let Some(hit) = self.storage.get(&self.version, &key) {
                    debug!(%key, "Cache hit");
                    return Ok(hit);
                }

                let response = self.upstream.fetch(&request).await?;
                if response.is_success() {
                    debug!(%key, "Caching response");
                    if let Err(e) = self.storage.put(&self.version, &key, response.clone()).await {
                        warn!(error = %e, %key, "Failed to store response");
                    }
                }
                Ok(response)
            }
            Route::Live | Route::Passthrough => self.upstream.fetch(&request).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    /// Upstream serving fixed responses by path.
    #[derive(Debug, Default)]
    pub(crate) struct MockUpstream {
        pub responses: Mutex<HashMap<String, (u16, String)>>,
        pub offline: std::sync::atomic::AtomicBool,
        pub calls: AtomicUsize,
    }

    impl MockUpstream {
        pub fn with(paths: &[(&str, u16, &str)]) -> Self {
            let upstream = Self::default();
            for (path, status, body) in paths {
                upstream
                    .responses
                    .lock()
                    .insert(path.to_string(), (*status, body.to_string()));
            }
            upstream
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for MockUpstream {
        async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(ProxyError::Upstream("connection refused".to_string()));
            }
            let (status, body) = self
                .responses
                .lock()
                .get(&request.path)
                .cloned()
                .unwrap_or((404, "not found".to_string()));
            Ok(ProxyResponse {
                status,
                headers: vec![("content-type".to_string(), "text/plain".to_string())],
                body: body.into_bytes(),
            })
        }
    }

    fn settings(assets: &[&str]) -> ProxySettings {
        ProxySettings {
            version: "v2".to_string(),
            assets: assets.iter().map(|s| s.to_string()).collect(),
            ..ProxySettings::default()
        }
    }

    fn proxy(upstream: Arc<MockUpstream>, assets: &[&str]) -> CacheProxy {
        CacheProxy::new(&settings(assets), Arc::new(CacheStorage::in_memory()), upstream)
    }

    fn cached_response(body: &str) -> ProxyResponse {
        ProxyResponse {
            status: 200,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_route_table() {
        let p = proxy(Arc::new(MockUpstream::default()), &[]);
        assert_eq!(p.route(&Method::GET, "/api/readAll"), Route::Live);
        assert_eq!(p.route(&Method::HEAD, "/api/config"), Route::Live);
        assert_eq!(p.route(&Method::POST, "/api/refresh"), Route::Passthrough);
        assert_eq!(p.route(&Method::GET, "/index.html"), Route::CacheFirst);
        assert_eq!(p.route(&Method::GET, "/js/main.js?v=2"), Route::CacheFirst);
        assert_eq!(p.route(&Method::POST, "/index.html"), Route::Passthrough);
    }

    #[tokio::test]
    async fn test_install_caches_every_asset() {
        let upstream = Arc::new(MockUpstream::with(&[
            ("/index.html", 200, "<html>"),
            ("/css/main.css", 200, "body{}"),
        ]));
        let p = proxy(upstream, &["/index.html", "/css/main.css"]);

        assert_eq!(p.install().await.unwrap(), 2);
        assert_eq!(p.storage().len("v2"), 2);
        assert_eq!(
            p.storage().get("v2", "GET /css/main.css").unwrap().body,
            b"body{}".to_vec()
        );
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let upstream = Arc::new(MockUpstream::with(&[("/index.html", 200, "<html>")]));
        let p = proxy(upstream, &["/index.html", "/missing.js"]);

        let err = p.install().await.unwrap_err();
        assert!(matches!(err, ProxyError::Install { ref path, .. } if path == "/missing.js"));
        assert_eq!(p.storage().len("v2"), 0);
    }

    #[tokio::test]
    async fn test_install_leaves_old_versions() {
        let upstream = Arc::new(MockUpstream::with(&[("/index.html", 200, "new")]));
        let p = proxy(upstream, &["/index.html"]);
        p.storage().put("v1", "GET /index.html", cached_response("old")).await.unwrap();

        p.install().await.unwrap();
        assert_eq!(p.storage().keys(), vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_deletes_every_cache() {
        let p = proxy(Arc::new(MockUpstream::default()), &[]);
        p.storage().put("v1", "GET /a", cached_response("a")).await.unwrap();
        p.storage().put("v2", "GET /b", cached_response("b")).await.unwrap();

        assert_eq!(p.activate().await.unwrap(), 2);
        assert!(p.storage().keys().is_empty());
    }

    #[tokio::test]
    async fn test_start_resets_then_installs() {
        let upstream = Arc::new(MockUpstream::with(&[("/index.html", 200, "new")]));
        let p = proxy(upstream, &["/index.html"]);
        p.storage().put("v1", "GET /index.html", cached_response("old")).await.unwrap();

        assert_eq!(p.start().await.unwrap(), 1);
        assert_eq!(p.storage().keys(), vec!["v2".to_string()]);
        assert_eq!(p.storage().get("v2", "GET /index.html").unwrap().body, b"new".to_vec());
    }

    #[tokio::test]
    async fn test_start_offline_keeps_existing_cache() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.offline.store(true, Ordering::SeqCst);
        let p = proxy(upstream, &["/index.html"]);
        p.storage().put("v2", "GET /index.html", cached_response("old")).await.unwrap();

        assert!(p.start().await.is_err());
        assert_eq!(p.storage().get("v2", "GET /index.html").unwrap().body, b"old".to_vec());
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let upstream = Arc::new(MockUpstream::with(&[("/index.html", 200, "fresh")]));
        let p = proxy(upstream.clone(), &[]);
        p.storage().put("v2", "GET /index.html", cached_response("cached")).await.unwrap();

        let response = p.handle(ProxyRequest::get("/index.html")).await.unwrap();
        assert_eq!(response.body, b"cached".to_vec());
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_stores_success_only() {
        let upstream = Arc::new(MockUpstream::with(&[("/app.js", 200, "js")]));
        let p = proxy(upstream.clone(), &[]);

        let response = p.handle(ProxyRequest::get("/app.js")).await.unwrap();
        assert_eq!(response.body, b"js".to_vec());
        assert!(p.storage().get("v2", "GET /app.js").is_some());

        // Served from the cache now, even with the upstream gone.
        upstream.offline.store(true, Ordering::SeqCst);
        let again = p.handle(ProxyRequest::get("/app.js")).await.unwrap();
        assert_eq!(again, response);
        assert_eq!(upstream.calls(), 1);

        upstream.offline.store(false, Ordering::SeqCst);
        let missing = p.handle(ProxyRequest::get("/nope.js")).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(p.storage().get("v2", "GET /nope.js").is_none());
    }

    #[tokio::test]
    async fn test_api_reads_bypass_cache() {
        let upstream = Arc::new(MockUpstream::with(&[("/api/readAll", 200, "{}")]));
        let p = proxy(upstream.clone(), &[]);
        p.storage().put("v2", "GET /api/readAll", cached_response("stale")).await.unwrap();

        let response = p.handle(ProxyRequest::get("/api/readAll")).await.unwrap();
        assert_eq!(response.body, b"{}".to_vec());
        assert_eq!(upstream.calls(), 1);
        assert_eq!(p.storage().get("v2", "GET /api/readAll").unwrap().body, b"stale".to_vec());
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.offline.store(true, Ordering::SeqCst);
        let p = proxy(upstream, &[]);

        let err = p.handle(ProxyRequest::get("/api/config")).await.unwrap_err();
        assert!(matches!(err, ProxyError::Upstream(_)));
    }
}
