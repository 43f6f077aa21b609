//! cache_purge tool implementation.
//!
//! Purges cache entries by domain, or trims buckets to a maximum size,
//! oldest entries first.

use orrery_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries whose URL matches this domain pattern, in every bucket.
    pub domain: Option<String>,

    /// Keep only the newest N entries per bucket.
    pub max_entries: Option<usize>,

    /// Restrict `max_entries` to this bucket.
    pub bucket: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.domain.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput("At least one of domain or max_entries must be specified".to_string()).into());
    }
    if params.bucket.is_some() && params.max_entries.is_none() {
        return Err(Error::InvalidInput("bucket only applies together with max_entries".to_string()).into());
    }

    let mut deleted_total = 0u64;

    if let Some(domain) = params.domain.as_deref() {
        deleted_total += cache.purge_snapshots_by_domain(domain).await?;
    }

    if let Some(max_entries) = params.max_entries {
        let buckets = match params.bucket {
            Some(bucket) => vec![bucket],
            None => cache.bucket_names().await?,
        };
        for bucket in &buckets {
            deleted_total += cache.purge_lru_snapshots(bucket, max_entries).await?;
        }
    }

    tracing::info!(deleted = deleted_total, "cache purged");
    json_result(&CachePurgeOutput { deleted: deleted_total })
}
