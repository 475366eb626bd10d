//! HTTP front end for [`CacheProxy`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::{CacheProxy, ProxyError, ProxyRequest, ProxyResponse};

/// Bind `listen_addr` and serve until the task is dropped.
pub async fn serve(proxy: Arc<CacheProxy>, listen_addr: &str) -> Result<(), ProxyError> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|_| ProxyError::Addr(listen_addr.to_string()))?;
    let listener = TcpListener::bind(addr).await?;
    serve_listener(proxy, listener).await
}

/// Serve connections from an already bound listener.
pub async fn serve_listener(proxy: Arc<CacheProxy>, listener: TcpListener) -> Result<(), ProxyError> {
    info!(addr = ?listener.local_addr().ok(), version = proxy.version(), "Proxy listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let proxy = proxy.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let proxy = proxy.clone();
                async move { handle_request(&proxy, req).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %e, "Proxy connection error");
            }
        });
    }
}

async fn handle_request(
    proxy: &CacheProxy,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Ok(plain_text(
                StatusCode::BAD_REQUEST,
                format!("Failed to read request body: {}", e),
            ))
        }
    };

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = ProxyRequest {
        method: parts.method,
        path,
        headers,
        body,
    };

    match proxy.handle(request).await {
        Ok(response) => Ok(into_hyper(response)),
        Err(e) => {
            warn!(error = %e, "Upstream unavailable");
            Ok(plain_text(StatusCode::BAD_GATEWAY, format!("Bad gateway: {}", e)))
        }
    }
}

fn into_hyper(response: ProxyResponse) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    for (name, value) in &response.headers {
        if super::upstream::is_hop_by_hop(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            out.headers_mut().append(name, value);
        }
    }
    out
}

fn plain_text(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(Bytes::from(message)));
    *out.status_mut() = status;
    out.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    out
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::proxy::tests::MockUpstream;
    use crate::proxy::{CacheStorage, HttpUpstream};
    use crate::settings::ProxySettings;

    async fn spawn_proxy(upstream: Arc<MockUpstream>) -> (SocketAddr, Arc<CacheProxy>) {
        let proxy = Arc::new(CacheProxy::new(
            &ProxySettings::default(),
            Arc::new(CacheStorage::in_memory()),
            upstream,
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_listener(proxy.clone(), listener));
        (addr, proxy)
    }

    #[tokio::test]
    async fn test_serves_and_caches_static_assets() {
        let upstream = Arc::new(MockUpstream::with(&[("/index.html", 200, "<html>")]));
        let (addr, proxy) = spawn_proxy(upstream.clone()).await;
        let client = reqwest::Client::new();

        let url = format!("http://{}/index.html", addr);
        let first = client.get(&url).send().await.unwrap();
        assert_eq!(first.status(), 200);
        assert_eq!(first.headers()["content-type"], "text/plain");
        assert_eq!(first.text().await.unwrap(), "<html>");

        upstream.offline.store(true, Ordering::SeqCst);
        let second = client.get(&url).send().await.unwrap();
        assert_eq!(second.text().await.unwrap(), "<html>");
        assert_eq!(upstream.calls(), 1);
        assert_eq!(proxy.storage().len(proxy.version()), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.offline.store(true, Ordering::SeqCst);
        let (addr, _proxy) = spawn_proxy(upstream).await;

        let response = reqwest::get(format!("http://{}/api/readAll", addr)).await.unwrap();
        assert_eq!(response.status(), 502);
        assert!(response.text().await.unwrap().starts_with("Bad gateway"));
    }

    #[tokio::test]
    async fn test_invalid_listen_address() {
        let proxy = Arc::new(CacheProxy::new(
            &ProxySettings::default(),
            Arc::new(CacheStorage::in_memory()),
            Arc::new(MockUpstream::default()),
        ));
        assert!(matches!(
            serve(proxy, "not-an-address").await,
            Err(ProxyError::Addr(_))
        ));
    }

    /// A bare HTTP server that answers every connection with `body` and
    /// counts the connections it accepted.
    async fn spawn_fixed_server(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes()).await;
            }
        });
        (addr, hits)
    }

    #[tokio::test]
    async fn test_protocol_relative_target_stays_on_origin() {
        let (origin, origin_hits) = spawn_fixed_server("origin").await;
        let (foreign, foreign_hits) = spawn_fixed_server("foreign").await;

        let upstream = HttpUpstream::new(&format!("http://{}", origin), Duration::from_secs(5)).unwrap();
        let proxy = Arc::new(CacheProxy::new(
            &ProxySettings::default(),
            Arc::new(CacheStorage::in_memory()),
            Arc::new(upstream),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_listener(proxy.clone(), listener));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET //{}/steal.js HTTP/1.1\r\nhost: {}\r\nconnection: close\r\n\r\n",
            foreign, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();

        assert!(reply.ends_with("origin"), "unexpected reply: {reply}");
        assert_eq!(foreign_hits.load(Ordering::SeqCst), 0);
        assert_eq!(origin_hits.load(Ordering::SeqCst), 1);
        let key = format!("GET //{}/steal.js", foreign);
        assert_eq!(proxy.storage().get(proxy.version(), &key).unwrap().body, b"origin".to_vec());
    }

    #[test]
    fn test_into_hyper_drops_invalid_headers() {
        let response = into_hyper(ProxyResponse {
            status: 201,
            headers: vec![
                ("x-ok".to_string(), "yes".to_string()),
                ("bad header".to_string(), "x".to_string()),
                ("Connection".to_string(), "close".to_string()),
            ],
            body: Vec::new(),
        });
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-ok"], "yes");
        assert_eq!(response.headers().len(), 1);
    }
}
