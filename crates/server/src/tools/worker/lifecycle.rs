//! sw_install and sw_activate tool implementations.

use orrery_client::fetch::Network;
use orrery_client::worker::{ActivateReport, InstallReport};
use orrery_client::{ServiceWorker, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use crate::tools::json_result;

/// Output structure for sw_install tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwInstallOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: InstallReport,
}

/// Output structure for sw_activate tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwActivateOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: ActivateReport,
}

/// Implementation of the sw_install tool.
pub async fn install_impl<N: Network>(worker: &ServiceWorker<N>) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&SwInstallOutput { state: worker.state().await, report })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl<N: Network>(worker: &ServiceWorker<N>) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&SwActivateOutput { state: worker.state().await, report })
}
