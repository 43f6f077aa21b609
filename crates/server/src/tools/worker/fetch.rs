//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the worker. Intercepted requests are answered
//! by the class strategy; non-GET http(s) requests go straight to the
//! network without touching the cache; other schemes are not handled.

use orrery_client::fetch::{Destination, Network, Request, Response, ResponseSource};
use orrery_client::{FetchOutcome, ServiceWorker};
use orrery_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL or site path (resolved against the configured origin).
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: document, style, script, image, font, manifest.
    /// Inferred from the path when omitted.
    #[serde(default)]
    pub destination: Option<String>,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// A response as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: String,
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy for binary content.
    pub body: String,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            source: response.source,
            content_type: response.content_type().map(str::to_string),
            headers: response.headers.clone(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_bytes: response.body.len(),
        }
    }
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    /// Whether the worker intercepted the request.
    pub intercepted: bool,
    pub class: Option<String>,
    pub strategy: Option<String>,
    /// Absent when nobody handled the request.
    pub response: Option<ResponseView>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<N: Network>(worker: &ServiceWorker<N>, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = worker.resolve(&params.url)?;
    let mut request = Request::new(&params.method, url);
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(Destination::parse(destination)?);
    }
    if let Some(accept) = params.accept.as_deref() {
        request = request.with_header("accept", accept);
    }

    let output = match worker.handle_fetch(&request).await {
        FetchOutcome::Respond { class, strategy, response } => SwFetchOutput {
            url: request.url.to_string(),
            intercepted: true,
            class: Some(class.as_str().to_string()),
            strategy: Some(strategy.as_str().to_string()),
            response: Some(ResponseView::from(&response)),
        },
        FetchOutcome::PassThrough if request.is_http() => {
            let response = worker.network().fetch(&request).await?;
            SwFetchOutput {
                url: request.url.to_string(),
                intercepted: false,
                class: None,
                strategy: None,
                response: Some(ResponseView::from(&response)),
            }
        }
        FetchOutcome::PassThrough => {
            tracing::debug!(url = %request.url, "scheme not handled");
            SwFetchOutput { url: request.url.to_string(), intercepted: false, class: None, strategy: None, response: None }
        }
    };

    json_result(&output)
}
