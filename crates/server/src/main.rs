//! orrery server entry point.
//!
//! Boots the service worker (install, then activate) and serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use orrery_client::fetch::Network;
use orrery_client::{FetchClient, FetchConfig, ServiceWorker, WorkerConfig};
use orrery_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        app = %config.app_name,
        version = %config.cache_version,
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting orrery server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);
    let worker = Arc::new(ServiceWorker::new(db, network, WorkerConfig::from_app_config(&config)?));

    boot(&worker).await;

    let handler = handler::OrreryServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Run install then activate. A failed boot leaves the server up so the
/// sw_install and sw_activate tools can retry.
async fn boot(worker: &handler::Worker) {
    match worker.install().await {
        Ok(report) if !report.is_complete() => {
            tracing::warn!(failed = report.failed.len(), "installed with missing precache entries");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "install failed");
            return;
        }
    }

    if let Err(e) = worker.activate().await {
        tracing::error!(error = %e, "activate failed");
    }
}
