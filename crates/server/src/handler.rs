//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and cache tools.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CachePurgeParams, buckets_impl, get_impl, purge_impl};
use crate::tools::worker::{
    ClientRegisterParams, SwFetchParams, SwMessageParams, SwNotificationClickParams, SwPushParams, activate_impl,
    click_impl, fetch_impl, install_impl, message_impl, push_impl, register_impl,
};

use orrery_client::ServiceWorker;
use orrery_client::fetch::Network;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The worker as hosted by the server, over any network.
pub type Worker = ServiceWorker<Arc<dyn Network>>;

/// The main MCP server handler for orrery.
#[derive(Clone)]
pub struct OrreryServer {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OrreryServer {
    /// Create a new server handler around an already booted worker.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Deliver a fetch event.
    ///
    /// GET requests are answered by the class strategy once the worker controls pages.
    #[tool(
        description = "Deliver a fetch event to the service worker. Returns the response, its source (network, cache, synthesized), the request class and strategy."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&*self.worker, params.0).await
    }

    #[tool(description = "Run the install event: open the current buckets and precache the manifest.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&*self.worker).await
    }

    #[tool(description = "Run the activate event: delete buckets of older versions and claim open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&*self.worker).await
    }

    #[tool(description = "Post a control message to the worker: SKIP_WAITING or CACHE_UPDATE with a list of urls.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&*self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Shows a notification unless the payload is malformed.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&*self.worker, params.0).await
    }

    #[tool(
        description = "Click a notification: closes it, then focuses a page already at its URL or opens a new one."
    )]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&*self.worker, params.0).await
    }

    #[tool(description = "Register an open page so the worker can claim, focus or find it.")]
    async fn client_register(&self, params: Parameters<ClientRegisterParams>) -> Result<CallToolResult, McpError> {
        register_impl(&*self.worker, params.0).await
    }

    #[tool(description = "Read a cached response by URL, from one bucket or the first that holds it.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.worker.db(), &self.worker.config().origin, params.0).await
    }

    #[tool(description = "List cache buckets with entry counts, marking current and stale versions.")]
    async fn cache_buckets(&self) -> Result<CallToolResult, McpError> {
        buckets_impl(self.worker.db(), &self.worker.config().namespace).await
    }

    #[tool(description = "Purge cached responses by domain, or trim buckets to the newest N entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.worker.db(), params.0).await
    }
}

impl ServerHandler for OrreryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "orrery".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline-first cache layer for the Solar System Explorer. Deliver browser events with the sw_* tools."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
