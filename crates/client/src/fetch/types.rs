//! Request and response values exchanged between the worker, the cache, and
//! the network.

use bytes::Bytes;
use orrery_core::cache::hash::compute_cache_key;
use orrery_core::{Error, Snapshot};
use serde::{Deserialize, Serialize};
use url::Url;

/// What the requesting page will do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Style,
    Script,
    Image,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl Destination {
    /// Infer a destination from the URL path, the way a page load would.
    pub fn infer(url: &Url) -> Self {
        let path = url.path().to_ascii_lowercase();
        let file = path.rsplit('/').next().unwrap_or("");

        if file == "manifest.json" || file.ends_with(".webmanifest") {
            return Destination::Manifest;
        }

        match file.rsplit_once('.').map(|(_, ext)| ext) {
            None => Destination::Document,
            Some("html" | "htm") => Destination::Document,
            Some("css") => Destination::Style,
            Some("js" | "mjs") => Destination::Script,
            Some("png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico") => Destination::Image,
            Some("woff" | "woff2" | "ttf" | "otf") => Destination::Font,
            Some(_) => Destination::Empty,
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "style" => Ok(Destination::Style),
            "script" => Ok(Destination::Script),
            "image" => Ok(Destination::Image),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// HTTP cache interaction requested for a network fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass intermediate HTTP caches and revalidate with the origin.
    Reload,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
    pub cache_mode: CacheMode,
}

impl Request {
    /// A GET request with the destination inferred from the path.
    pub fn get(url: Url) -> Self {
        let destination = Destination::infer(&url);
        Self { method: "GET".into(), url, destination, headers: Vec::new(), cache_mode: CacheMode::Default }
    }

    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), ..Self::get(url) }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Cache-busting variant used for precache and explicit refreshes.
    pub fn reload(mut self) -> Self {
        self.cache_mode = CacheMode::Reload;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Key this request is stored under in every bucket.
    pub fn cache_key(&self) -> String {
        compute_cache_key(&self.method, self.url.as_str())
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

/// A response produced by the network, a bucket, or the worker itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Final URL, absent for synthesized responses.
    pub url: Option<Url>,
    pub source: ResponseSource,
}

impl Response {
    /// A worker-made response with a single content type header.
    pub fn synthesized(status: u16, status_text: &str, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: vec![("content-type".into(), content_type.into())],
            body: body.into(),
            url: None,
            source: ResponseSource::Synthesized,
        }
    }

    /// 2xx, the only responses worth caching.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Capture this response for storage in `bucket` under `request`'s key.
    pub fn to_snapshot(&self, bucket: &str, request: &Request) -> Result<Snapshot, Error> {
        let headers_json = serde_json::to_string(&self.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;

        Ok(Snapshot {
            bucket: bucket.to_string(),
            key_hash: request.cache_key(),
            method: request.method.clone(),
            url: request.url.to_string(),
            status_code: self.status,
            status_text: Some(self.status_text.clone()),
            content_type: self.content_type().map(str::to_string),
            headers_json,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Replay a stored snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, Error> {
        let headers = snapshot.headers()?;
        let url = Url::parse(&snapshot.url).ok();

        Ok(Self {
            status: snapshot.status_code,
            status_text: snapshot.status_text.unwrap_or_default(),
            headers,
            body: Bytes::from(snapshot.body),
            url,
            source: ResponseSource::Cache,
        })
    }
}
