//! Fixed-route network and worker fixtures for tool tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use orrery_client::fetch::{Network, Request, Response, ResponseSource};
use orrery_client::{ServiceWorker, WorkerConfig};
use orrery_core::{AppConfig, CacheDb, Error};
use rmcp::model::CallToolResult;

use crate::handler::Worker;

#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: HashMap<String, (u16, &'static str, &'static str)>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub(crate) fn with(mut self, url: &str, status: u16, content_type: &'static str, body: &'static str) -> Self {
        self.routes.insert(url.to_string(), (status, content_type, body));
        self
    }

    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::HttpError(format!("network error for {}: offline", request.url)));
        }
        let (status, content_type, body) =
            self.routes.get(request.url.as_str()).copied().unwrap_or((404, "text/plain", "Not Found"));

        Ok(Response {
            status,
            status_text: String::new(),
            headers: vec![("content-type".into(), content_type.into())],
            body: body.into(),
            url: Some(request.url.clone()),
            source: ResponseSource::Network,
        })
    }
}

/// An installed and activated worker whose manifest is just `/`.
pub(crate) async fn worker(network: Arc<StubNetwork>) -> Arc<Worker> {
    let app = AppConfig { precache: vec!["/".into()], ..Default::default() };
    let config = WorkerConfig::from_app_config(&app).unwrap();
    let db = CacheDb::open_in_memory().await.unwrap();
    let network: Arc<dyn Network> = network;

    let worker = ServiceWorker::new(db, network, config);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    Arc::new(worker)
}

/// A stub whose home page is routed so install succeeds.
pub(crate) fn home_network() -> StubNetwork {
    StubNetwork::default().with("http://localhost:8080/", 200, "text/html", "<h1>Solar System Explorer</h1>")
}

/// Parse the JSON text a tool returned.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
