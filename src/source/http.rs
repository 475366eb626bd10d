//! HTTP backend client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiError, Config, HealthRecord, Snapshot, StatusApi};

/// Default request timeout for backend calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the status backend over HTTP.
///
/// Paths are resolved against the base URL, so the base should end with a
/// slash (`http://host:8765/api/`). A missing trailing slash is added.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
    description: String,
}

impl HttpApi {
    /// Create a client with default settings.
    pub fn new(base: &str) -> Result<Self, ApiError> {
        Self::builder().base(base).build()
    }

    /// Create a builder for configuring the client.
    pub fn builder() -> HttpApiBuilder {
        HttpApiBuilder::default()
    }

    /// The base URL all API paths are resolved against.
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|e| ApiError::Url(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "backend request");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl StatusApi for HttpApi {
    async fn config(&self) -> Result<Config, ApiError> {
        self.get_json(self.url("config")?).await
    }

    async fn read_all(&self) -> Result<Snapshot, ApiError> {
        self.get_json(self.url("readAll")?).await
    }

    async fn refresh_all(&self) -> Result<Snapshot, ApiError> {
        self.get_json(self.url("refreshAll")?).await
    }

    async fn refresh_endpoint(
        &self,
        group: &str,
        endpoint: &str,
    ) -> Result<HealthRecord, ApiError> {
        let mut url = self.url("refresh")?;
        url.query_pairs_mut()
            .append_pair("group", group)
            .append_pair("endpoint", endpoint);
        self.get_json(url).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpApi`].
#[derive(Debug, Default)]
pub struct HttpApiBuilder {
    base: Option<String>,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl HttpApiBuilder {
    /// Set the API base URL.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send an extra header with every request, e.g. the header the backend
    /// checks for authorization.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpApi, ApiError> {
        let raw = self.base.unwrap_or_else(|| "http://localhost:8765/api/".to_string());
        let normalized = if raw.ends_with('/') {
            raw
        } else {
            format!("{}/", raw)
        };
        let base = Url::parse(&normalized).map_err(|e| ApiError::Url(e.to_string()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Http(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Http(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .default_headers(headers)
            .build()?;

        Ok(HttpApi {
            client,
            description: format!("http: {}", base),
            base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_gets_trailing_slash() {
        let api = HttpApi::new("http://localhost:8765/api").unwrap();
        assert_eq!(api.base().as_str(), "http://localhost:8765/api/");
        assert_eq!(api.description(), "http: http://localhost:8765/api/");
    }

    #[test]
    fn test_paths_resolve_under_base() {
        let api = HttpApi::new("http://localhost:8765/api/").unwrap();
        assert_eq!(
            api.url("readAll").unwrap().as_str(),
            "http://localhost:8765/api/readAll"
        );
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        let err = HttpApi::new("not a url").unwrap_err();
        assert!(matches!(err, ApiError::Url(_)));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let err = HttpApi::builder()
            .base("http://localhost/api/")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
    }
}
