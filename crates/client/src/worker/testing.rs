//! Scripted network and worker fixtures for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use orrery_core::{AppConfig, CacheDb, Error};

use super::{ServiceWorker, WorkerConfig};
use crate::fetch::{Network, Request, Response, ResponseSource};

type Route = (u16, String, Bytes);

/// In-memory network: fixed routes, an online switch, a hang switch, and a call log.
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<Request>>,
    online: AtomicBool,
    hang: AtomicBool,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            hang: AtomicBool::new(false),
        }
    }

    pub(crate) fn route(&self, url: &str, status: u16, content_type: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, content_type.to_string(), Bytes::from(body.to_string())));
    }

    pub(crate) fn route_if_absent(&self, url: &str, status: u16, content_type: &str, body: &str) {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry(url.to_string())
            .or_insert_with(|| (status, content_type.to_string(), Bytes::from(body.to_string())));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.url.as_str() == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn last_call(&self) -> Option<Request> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());

        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::HttpError(format!("network error for {}: offline", request.url)));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        let (status, content_type, body) =
            route.unwrap_or_else(|| (404, "text/plain".to_string(), Bytes::from_static(b"Not Found")));

        Ok(Response {
            status,
            status_text: if status == 200 { "OK".into() } else { String::new() },
            headers: vec![("content-type".into(), content_type)],
            body,
            url: Some(request.url.clone()),
            source: ResponseSource::Network,
        })
    }
}

/// Worker settings pointing at `http://localhost:8080` with a three-entry manifest.
pub(crate) fn test_config() -> WorkerConfig {
    let app = AppConfig {
        precache: vec!["/".into(), "/index.html".into(), "/css/style.css".into()],
        ..Default::default()
    };
    WorkerConfig::from_app_config(&app).unwrap()
}

/// Route every manifest entry with a 200 so install succeeds.
pub(crate) fn route_manifest(network: &ScriptedNetwork, config: &WorkerConfig) {
    for path in &config.precache {
        let url = config.origin.join(path).unwrap();
        let (content_type, body) = if path.ends_with(".css") {
            ("text/css", format!("/* {path} */"))
        } else {
            ("text/html", format!("<html><body>{path}</body></html>"))
        };
        network.route_if_absent(url.as_str(), 200, content_type, &body);
    }
}

/// A worker that has been installed and activated against an in-memory cache.
pub(crate) async fn activated_worker(
    network: Arc<ScriptedNetwork>, config: WorkerConfig,
) -> ServiceWorker<Arc<ScriptedNetwork>> {
    route_manifest(&network, &config);
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = ServiceWorker::new(db, network, config);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker
}
