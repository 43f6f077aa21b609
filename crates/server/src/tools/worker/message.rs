//! sw_message tool implementation.
//!
//! Posts a runtime control message (`SKIP_WAITING`, `CACHE_UPDATE`) to the worker.

use orrery_client::ServiceWorker;
use orrery_client::fetch::Network;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Input parameters for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message object, e.g. `{"type": "CACHE_UPDATE", "urls": ["/pages/planets.html"]}`.
    pub message: serde_json::Value,
}

/// Implementation of the sw_message tool.
pub async fn message_impl<N: Network>(worker: &ServiceWorker<N>, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let reply = worker.handle_message(&params.message).await?;
    json_result(&reply)
}
