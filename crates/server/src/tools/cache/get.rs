//! cache_get tool implementation.
//!
//! Retrieves a stored response by request, from one bucket or from the
//! first bucket that holds it.

use orrery_client::fetch::resolve;
use orrery_core::{CacheDb, Error, cache::hash::compute_cache_key};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or site path of the cached request.
    pub url: String,

    /// Request method the entry was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Only look in this bucket.
    #[serde(default)]
    pub bucket: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub key_hash: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy for binary content.
    pub body: String,
    pub body_bytes: usize,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&params.url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let key = compute_cache_key(&params.method, url.as_str());

    let found = match params.bucket.as_deref() {
        Some(bucket) => cache.match_snapshot(bucket, &key).await?,
        None => cache.match_any(&key).await?,
    };
    let snapshot = found.ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        headers: snapshot.headers()?,
        body: String::from_utf8_lossy(&snapshot.body).into_owned(),
        body_bytes: snapshot.body.len(),
        bucket: snapshot.bucket,
        key_hash: snapshot.key_hash,
        url: snapshot.url,
        status_code: snapshot.status_code,
        content_type: snapshot.content_type,
        stored_at: snapshot.stored_at,
    };

    json_result(&output)
}
