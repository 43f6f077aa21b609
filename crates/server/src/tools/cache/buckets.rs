//! cache_buckets tool implementation.
//!
//! Lists every bucket with its entry count and how it relates to the
//! current namespace.

use orrery_core::{BucketRole, CacheDb, CacheNamespace};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketEntry {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
    /// Role within this app's namespace, if the bucket belongs to it.
    pub role: Option<BucketRole>,
    /// Belongs to the current version.
    pub current: bool,
    /// Belongs to an older version and will go at the next activation.
    pub stale: bool,
}

/// Output from the cache_buckets tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheBucketsOutput {
    pub version: String,
    pub buckets: Vec<BucketEntry>,
}

/// Implementation of the cache_buckets tool.
pub async fn buckets_impl(cache: &CacheDb, namespace: &CacheNamespace) -> Result<CallToolResult, McpError> {
    let buckets = cache
        .list_buckets()
        .await?
        .into_iter()
        .map(|info| BucketEntry {
            role: namespace.role_of(&info.name),
            current: namespace.is_current(&info.name),
            stale: namespace.is_stale(&info.name),
            name: info.name,
            created_at: info.created_at,
            entries: info.entries,
        })
        .collect();

    json_result(&CacheBucketsOutput { version: namespace.version().to_string(), buckets })
}
