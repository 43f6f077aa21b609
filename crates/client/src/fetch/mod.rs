//! HTTP fetch pipeline used by the worker's network tiers.
//!
//! ### Network seam
//! - [`Network`] is the only way the worker reaches the network.
//! - [`FetchClient`] implements it over reqwest; tests script their own.
//!
//! ### Safety gates
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Hard timeout around the whole exchange, not just connect
//!
//! ### Semantics
//! - Non-2xx statuses are responses, not failures. Only transport errors,
//!   timeouts and oversize bodies are `Err`.
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` and `Pragma: no-cache`.

pub mod types;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use types::{CacheMode, Destination, Request, Response, ResponseSource};
pub use url::{UrlError, resolve};

use orrery_core::Error;

/// Source of network responses for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform `request` against the network.
    ///
    /// Resolves for any HTTP status; errors only when no response exists.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

#[async_trait]
impl<T: Network + ?Sized> Network for std::sync::Arc<T> {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        (**self).fetch(request).await
    }
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "orrery/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "orrery/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &orrery_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client with size and time limits.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
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
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn exchange(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| transport_error(&request.url, e))?;

        let status = response.status();
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
            url: Some(final_url),
            source: ResponseSource::Network,
        })
    }
}

fn transport_error(url: &reqwest::Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::HttpError(format!("network error for {url}: {err}"))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        match tokio::time::timeout(self.config.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!(
                "{} after {}ms",
                request.url,
                self.config.timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig { timeout: Duration::from_secs(5), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "orrery/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = orrery_core::AppConfig { user_agent: "explorer-test".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.user_agent, "explorer-test");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/css/style.css")
            .with_status(200)
            .with_header("content-type", "text/css")
            .with_body("body { background: #000; }")
            .create_async()
            .await;

        let url = ::url::Url::parse(&format!("{}/css/style.css", server.url())).unwrap();
        let response = client().fetch(&Request::get(url)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(&response.body[..], b"body { background: #000; }");
        assert_eq!(response.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_fetch_error_status_resolves() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing.html").with_status(404).with_body("gone").create_async().await;

        let url = ::url::Url::parse(&format!("{}/missing.html", server.url())).unwrap();
        let response = client().fetch(&Request::get(url)).await.unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_reload_sends_no_cache_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/index.html")
            .match_header("cache-control", "no-cache")
            .match_header("pragma", "no-cache")
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let url = ::url::Url::parse(&format!("{}/index.html", server.url())).unwrap();
        let response = client().fetch(&Request::get(url).reload()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/images/nebula.png")
            .with_status(200)
            .with_body(vec![0u8; 2048])
            .create_async()
            .await;

        let client = FetchClient::new(FetchConfig { max_bytes: 1024, ..Default::default() }).unwrap();
        let url = ::url::Url::parse(&format!("{}/images/nebula.png", server.url())).unwrap();
        let result = client.fetch(&Request::get(url)).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_http_error() {
        let url = ::url::Url::parse("http://127.0.0.1:1/index.html").unwrap();
        let err = client().fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::HttpError(_)), "{err}");
    }
}
