//! Network fetch layer.
//!
//! The interceptor talks to the network through the [`Network`] trait so
//! lifecycle and fetch handling can be exercised without a live origin.
//! [`FetchClient`] is the reqwest-backed implementation.
//!
//! Requests go out as sent, with their own method and headers, and any response
//! comes back unmodified whatever its status or size. Only a failure to get a
//! response at all is an error; the caller decides what is cacheable.

pub mod url;

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use std::time::{Duration, Instant};

pub use url::{UrlError, resolve};

use trailhead_core::{AppConfig, CachedRequest, CachedResponse, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "trailhead/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "trailhead/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// An outgoing request seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    /// Forwarded as-is; not part of the cache identity.
    pub headers: HeaderMap,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Cache identity of this request.
    pub fn to_cached(&self) -> CachedRequest {
        CachedRequest { method: self.method.as_str().to_string(), url: self.url.to_string() }
    }
}

/// A response, from the network or rebuilt from a cache entry.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL the response belongs to
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds (0 for cached responses)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Content-Type header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot for cache storage. Header values that are not valid UTF-8 are dropped.
    pub fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            url: self.url.to_string(),
            status: self.status.as_u16(),
            headers: self
                .headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
                .collect(),
            body: self.bytes.to_vec(),
            stored_at: None,
        }
    }

    /// Rebuild a response from a cache entry.
    pub fn from_cached(cached: CachedResponse) -> Result<Self, Error> {
        let url = Url::parse(&cached.url).map_err(|e| Error::CorruptEntry(format!("url {}: {e}", cached.url)))?;
        let status = StatusCode::from_u16(cached.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", cached.status)))?;

        let mut headers = HeaderMap::with_capacity(cached.headers.len());
        for (name, value) in &cached.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("header name {name}: {e}")))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(format!("header value for {name}: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, bytes: Bytes::from(cached.body), fetch_ms: 0 })
    }
}

/// Anything that can answer a request from the network.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Err only when no response was received.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("timed out fetching {}", request.url))
                } else {
                    Error::Network(format!("{}: {e}", request.url))
                }
            })?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, status, headers, bytes, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_response(status: StatusCode) -> FetchResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        headers.append("x-served-by", HeaderValue::from_static("edge-1"));
        FetchResponse {
            url: Url::parse("http://localhost:3000/about?ref=nav").unwrap(),
            status,
            headers,
            bytes: Bytes::from_static(b"<h1>About</h1>"),
            fetch_ms: 12,
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "trailhead/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_request_cache_identity_keeps_query() {
        let request = FetchRequest::get(Url::parse("http://localhost:3000/about?ref=nav").unwrap());
        let cached = request.to_cached();
        assert_eq!(cached.method, "GET");
        assert_eq!(cached.url, "http://localhost:3000/about?ref=nav");
    }

    #[test]
    fn test_cached_snapshot_restores_response() {
        let original = html_response(StatusCode::OK);
        let restored = FetchResponse::from_cached(original.to_cached()).unwrap();

        assert_eq!(restored.url, original.url);
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.bytes, original.bytes);
        assert_eq!(restored.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(restored.headers.get("x-served-by").unwrap(), "edge-1");
        assert_eq!(restored.fetch_ms, 0);
    }

    #[test]
    fn test_from_cached_rejects_bad_status() {
        let mut cached = html_response(StatusCode::OK).to_cached();
        cached.status = 1000;
        assert!(matches!(FetchResponse::from_cached(cached), Err(Error::CorruptEntry(_))));
    }

    /// Serve one canned response on a loopback port; the handle yields the request head.
    async fn serve_once(head: &'static str, body: Vec<u8>) -> (Url, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/media/intro.mp4", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }

            let response_head = format!("{head}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len());
            socket.write_all(response_head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).to_lowercase()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_fetch_forwards_request_headers_and_returns_large_body() {
        let body = vec![7u8; 8 * 1024 * 1024];
        let (url, server) = serve_once("HTTP/1.1 200 OK\r\nContent-Type: video/mp4", body.clone()).await;

        let mut request = FetchRequest::get(url);
        request.headers.insert(header::ACCEPT, HeaderValue::from_static("video/*"));
        request.headers.insert("x-trail", HeaderValue::from_static("1"));

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let response = client.fetch(&request).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), Some("video/mp4"));
        assert_eq!(response.bytes.len(), body.len());

        let head = server.await.unwrap();
        assert!(head.contains("accept: video/*"));
        assert!(head.contains("x-trail: 1"));
        assert!(!head.contains("text/html"));
    }

    #[tokio::test]
    async fn test_fetch_returns_error_status_unchanged() {
        let (url, server) =
            serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain", b"busy".to_vec()).await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let response = client.fetch(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.bytes.as_ref(), b"busy");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
