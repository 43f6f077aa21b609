//! sw_push, sw_notification_click and client_register tool implementations.

use orrery_client::ServiceWorker;
use orrery_client::fetch::Network;
use orrery_client::worker::Notification;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Input parameters for sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push payload, a JSON object with optional title, body, icon and url.
    #[serde(default)]
    pub data: Option<String>,
}

/// Output structure for sw_push tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwPushOutput {
    /// The notification shown, absent when the payload was malformed.
    pub shown: Option<Notification>,
}

/// Input parameters for sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Id returned by sw_push.
    pub id: u64,
}

/// Input parameters for client_register tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientRegisterParams {
    /// URL or site path of the open page.
    pub url: String,
}

/// Implementation of the sw_push tool.
pub async fn push_impl<N: Network>(worker: &ServiceWorker<N>, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let shown = worker.handle_push(params.data.as_deref()).await;
    json_result(&SwPushOutput { shown })
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl<N: Network>(
    worker: &ServiceWorker<N>, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let action = worker.notification_click(params.id).await?;
    json_result(&action)
}

/// Implementation of the client_register tool.
pub async fn register_impl<N: Network>(
    worker: &ServiceWorker<N>, params: ClientRegisterParams,
) -> Result<CallToolResult, McpError> {
    let url = worker.resolve(&params.url)?;
    let client = worker.clients().register(url).await;
    json_result(&client)
}
