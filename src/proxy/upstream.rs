use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use super::{ProxyError, ProxyRequest, ProxyResponse};

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub(crate) fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Where the proxy sends requests it does not answer from the cache.
#[async_trait]
pub trait Upstream: Send + Sync + Debug {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError>;
}

/// Forwards requests to an HTTP origin.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    origin: Url,
}

impl HttpUpstream {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let origin = Url::parse(origin).map_err(|e| ProxyError::Upstream(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;
        Ok(Self { client, origin })
    }

    /// The origin with the request's path and query. The scheme and
    /// authority always come from the origin, even for targets like
    /// `//other-host/x` that a URL join would treat as a new host.
    pub fn target_url(&self, path_and_query: &str) -> Url {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let url = self.target_url(&request.path);

        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?
            .to_vec();

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}
