//! Offline-first request interception.
//!
//! The worker owns three cache buckets (static, dynamic, api) under a
//! versioned namespace and answers every intercepted GET with a response,
//! choosing between cache and network by request class. The host delivers
//! lifecycle events (install, activate), fetches, page messages, pushes and
//! notification clicks; each maps to one method here.

pub mod classify;
pub mod clients;
pub mod lifecycle;
pub mod messages;
pub mod offline;
pub mod push;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use orrery_core::{AppConfig, BucketRole, CacheDb, CacheNamespace, Error};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{Network, Request, Response, resolve};

pub use classify::{Classifier, RequestClass};
pub use clients::{Clients, WindowClient};
pub use lifecycle::{ActivateReport, InstallReport, PrecacheFailure};
pub use messages::{ClientMessage, MessageReply, UpdateFailure};
pub use push::{Notification, NotificationAction, PushPayload};
pub use strategy::{Fallback, Strategy, Tier};

/// Worker settings derived from the app configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub namespace: CacheNamespace,
    pub origin: Url,
    pub precache: Vec<String>,
    pub classifier: Classifier,
    pub home_path: String,
    pub precache_strict: bool,
    /// Upper bound on any single network attempt.
    pub network_timeout: Duration,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;

        Ok(Self {
            namespace: config.namespace(),
            origin,
            precache: config.precache.clone(),
            classifier: Classifier::new(config.api_patterns.clone(), config.static_extensions.clone()),
            home_path: config.home_path.clone(),
            precache_strict: config.precache_strict,
            network_timeout: config.timeout(),
        })
    }
}

/// Lifecycle state of the newest worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Result of delivering a fetch event.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host handles the request itself.
    PassThrough,
    Respond { class: RequestClass, strategy: Strategy, response: Response },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::Respond { response, .. } => Some(response),
        }
    }
}

/// The service worker.
pub struct ServiceWorker<N> {
    db: CacheDb,
    network: N,
    config: WorkerConfig,
    state: RwLock<WorkerState>,
    /// Set once any activation completed; from then on fetches are intercepted.
    controlling: AtomicBool,
    clients: Clients,
    notifications: RwLock<Vec<Notification>>,
    next_notification: AtomicU64,
}

impl<N: Network> ServiceWorker<N> {
    pub fn new(db: CacheDb, network: N, config: WorkerConfig) -> Self {
        Self {
            db,
            network,
            config,
            state: RwLock::new(WorkerState::Parsed),
            controlling: AtomicBool::new(false),
            clients: Clients::new(),
            notifications: RwLock::new(Vec::new()),
            next_notification: AtomicU64::new(0),
        }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether fetch events are currently intercepted.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }

    /// Resolve a site path or URL against the configured origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(input, &self.config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        self.config.classifier.classify(request)
    }

    /// Handle a fetch event.
    ///
    /// Non-GET and non-http(s) requests, and any request before the first
    /// activation, pass through untouched. Everything else always gets a
    /// response: network and cache failures only move evaluation to the
    /// next tier of the plan.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        if !request.is_get() || !request.is_http() {
            tracing::debug!(method = %request.method, url = %request.url, "pass-through");
            return FetchOutcome::PassThrough;
        }
        if !self.is_controlling() {
            tracing::debug!(url = %request.url, "not yet controlling, pass-through");
            return FetchOutcome::PassThrough;
        }

        let class = self.classify(request);
        let strategy = Strategy::for_class(class);
        let response = self.run_plan(request, &strategy::plan(class)).await;

        tracing::debug!(
            url = %request.url,
            class = class.as_str(),
            strategy = strategy.as_str(),
            status = response.status,
            source = ?response.source,
            "fetch handled"
        );

        FetchOutcome::Respond { class, strategy, response }
    }

    async fn run_plan(&self, request: &Request, tiers: &[Tier]) -> Response {
        for tier in tiers {
            if let Some(response) = self.try_tier(request, *tier).await {
                return response;
            }
        }
        offline::synthesize(Fallback::ServiceUnavailable)
    }

    async fn try_tier(&self, request: &Request, tier: Tier) -> Option<Response> {
        match tier {
            Tier::Cache => self.cached(request).await,
            Tier::Network(role) => match self.fetch_network(request).await {
                Ok(response) => {
                    if response.is_ok() {
                        self.store(role, request, &response).await;
                    }
                    Some(response)
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "network failed, falling back");
                    None
                }
            },
            Tier::CachedHome => {
                let home = self.resolve(&self.config.home_path).ok()?;
                self.cached(&Request::get(home)).await
            }
            Tier::Synthesized(fallback) => Some(offline::synthesize(fallback)),
        }
    }

    /// Network attempt raced against the configured timeout.
    pub(crate) async fn fetch_network(&self, request: &Request) -> Result<Response, Error> {
        match tokio::time::timeout(self.config.network_timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!(
                "{} after {}ms",
                request.url,
                self.config.network_timeout.as_millis()
            ))),
        }
    }

    /// Cached copy of `request`.
    ///
    /// The current `dynamic` and `api` buckets are searched before `static`,
    /// so a refreshed copy wins over the install-time one. Other buckets are
    /// only consulted when none of the current ones hold the key.
    pub async fn cached(&self, request: &Request) -> Option<Response> {
        let key = request.cache_key();
        let lookup = match self.db.match_in(&self.config.namespace.lookup_order(), &key).await {
            Ok(Some(found)) => Ok(Some(found)),
            Ok(None) => self.db.match_any(&key).await,
            Err(e) => Err(e),
        };
        let snapshot = match lookup {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                return None;
            }
        };

        match Response::from_snapshot(snapshot) {
            Ok(response) => {
                tracing::debug!("cache hit for {}", request.url);
                Some(response)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "unreadable cache entry");
                None
            }
        }
    }

    /// Copy a response into the current bucket for `role`. Failures are logged only.
    pub(crate) async fn store(&self, role: BucketRole, request: &Request, response: &Response) -> bool {
        let bucket = self.config.namespace.bucket_name(role);
        let result = match response.to_snapshot(&bucket, request) {
            Ok(snapshot) => self.db.put_snapshot(&snapshot).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url = %request.url, bucket = %bucket, error = %e, "cache write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedNetwork, activated_worker, test_config};
    use super::*;
    use crate::fetch::ResponseSource;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_non_get_passes_through_without_cache_writes() {
        let network = Arc::new(ScriptedNetwork::new());
        network.route("http://localhost:8080/api/favorites", 200, "application/json", "{}");
        let worker = activated_worker(network.clone(), test_config()).await;
        let before = worker.db().list_buckets().await.unwrap();

        for method in ["POST", "PUT", "DELETE", "PATCH"] {
            let request = Request::new(method, worker.resolve("/api/favorites").unwrap());
            assert!(matches!(worker.handle_fetch(&request).await, FetchOutcome::PassThrough));
        }

        assert_eq!(network.total_calls(), 0);
        assert_eq!(worker.db().list_buckets().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_foreign_scheme_passes_through() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = activated_worker(network.clone(), test_config()).await;

        let request = Request::get(Url::parse("chrome-extension://abcdef/content.css").unwrap());
        assert!(matches!(worker.handle_fetch(&request).await, FetchOutcome::PassThrough));
        assert_eq!(network.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_before_activation_passes_through() {
        let network = Arc::new(ScriptedNetwork::new());
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = ServiceWorker::new(db, network.clone(), test_config());

        let request = Request::get(worker.resolve("/css/style.css").unwrap());
        assert!(matches!(worker.handle_fetch(&request).await, FetchOutcome::PassThrough));
    }

    #[tokio::test]
    async fn test_static_asset_cache_first_end_to_end() {
        let network = Arc::new(ScriptedNetwork::new());
        network.route("http://localhost:8080/css/planets.css", 200, "text/css", ".mars{color:red}");
        let worker = activated_worker(network.clone(), test_config()).await;
        let request = Request::get(worker.resolve("/css/planets.css").unwrap());

        let first = worker.handle_fetch(&request).await;
        let FetchOutcome::Respond { class, strategy, response } = first else { panic!("expected response") };
        assert_eq!(class, RequestClass::StaticAsset);
        assert_eq!(strategy, Strategy::CacheFirst);
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(network.calls_for("http://localhost:8080/css/planets.css"), 1);

        let dynamic = worker.config().namespace.bucket_name(BucketRole::Dynamic);
        assert!(worker.db().match_snapshot(&dynamic, &request.cache_key()).await.unwrap().is_some());

        let second = worker.handle_fetch(&request).await;
        let response = second.response().unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b".mars{color:red}");
        assert_eq!(network.calls_for("http://localhost:8080/css/planets.css"), 1);
    }

    #[tokio::test]
    async fn test_cached_static_asset_issues_no_network_call() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = activated_worker(network.clone(), test_config()).await;
        let precached = "http://localhost:8080/css/style.css";
        let installs = network.calls_for(precached);

        let request = Request::get(Url::parse(precached).unwrap());
        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(network.calls_for(precached), installs);
    }

    #[tokio::test]
    async fn test_static_asset_total_failure_is_503() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = activated_worker(network.clone(), test_config()).await;
        network.set_online(false);

        let request = Request::get(worker.resolve("/images/jupiter.png").unwrap());
        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.source, ResponseSource::Synthesized);
    }

    #[tokio::test]
    async fn test_html_network_failure_returns_cached_copy_unmodified() {
        let network = Arc::new(ScriptedNetwork::new());
        network.route("http://localhost:8080/pages/index.html", 200, "text/html", "<h1>Orbits v1</h1>");
        let worker = activated_worker(network.clone(), test_config()).await;
        let request = Request::get(worker.resolve("/pages/index.html").unwrap());

        let online = worker.handle_fetch(&request).await.response().cloned().unwrap();
        network.set_online(false);
        let offline = worker.handle_fetch(&request).await;

        let FetchOutcome::Respond { class, strategy, response } = offline else { panic!("expected response") };
        assert_eq!(class, RequestClass::Html);
        assert_eq!(strategy, Strategy::NetworkFirstWithOfflineFallback);
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body, online.body);
        assert_eq!(response.headers, online.headers);
        assert_eq!(response.status, online.status);
    }

    #[tokio::test]
    async fn test_offline_html_prefers_refreshed_copy_over_precache() {
        let network = Arc::new(ScriptedNetwork::new());
        let page = "http://localhost:8080/index.html";
        network.route(page, 200, "text/html", "<h1>install-time</h1>");
        let worker = activated_worker(network.clone(), test_config()).await;
        let request = Request::get(worker.resolve("/index.html").unwrap());

        network.route(page, 200, "text/html", "<h1>fresh</h1>");
        let online = worker.handle_fetch(&request).await.response().cloned().unwrap();
        assert_eq!(online.source, ResponseSource::Network);

        network.set_online(false);
        let offline = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(offline.source, ResponseSource::Cache);
        assert_eq!(&offline.body[..], b"<h1>fresh</h1>");
    }

    #[tokio::test]
    async fn test_cached_falls_back_to_other_buckets() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = activated_worker(network, test_config()).await;
        let request = Request::get(worker.resolve("/pages/archive.html").unwrap());
        let response = Response::synthesized(200, "OK", "text/html", "<h1>archive</h1>");
        worker.db().open_bucket("shared-archive").await.unwrap();
        worker
            .db()
            .put_snapshot(&response.to_snapshot("shared-archive", &request).unwrap())
            .await
            .unwrap();

        let cached = worker.cached(&request).await.unwrap();
        assert_eq!(&cached.body[..], b"<h1>archive</h1>");
    }

    #[tokio::test]
    async fn test_html_falls_back_to_cached_home() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = activated_worker(network.clone(), test_config()).await;
        network.set_online(false);

        let request = Request::get(worker.resolve("/pages/never-visited.html").unwrap());
        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.url.as_ref().map(Url::path), Some("/"));
    }

    #[tokio::test]
    async fn test_html_offline_page_when_nothing_cached() {
        let network = Arc::new(ScriptedNetwork::new());
        let config = WorkerConfig { precache: Vec::new(), ..test_config() };
        let worker = activated_worker(network.clone(), config).await;
        network.set_online(false);

        let request = Request::get(worker.resolve("/pages/quiz.html").unwrap());
        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.source, ResponseSource::Synthesized);
        let body = std::str::from_utf8(&response.body).unwrap();
        assert!(body.contains(offline::RETRY_CONTROL_ID));
    }

    #[tokio::test]
    async fn test_api_network_first_uses_api_bucket() {
        let network = Arc::new(ScriptedNetwork::new());
        let apod = "https://api.nasa.gov/planetary/apod?api_key=DEMO_KEY";
        network.route(apod, 200, "application/json", r#"{"title":"Pillars"}"#);
        let worker = activated_worker(network.clone(), test_config()).await;
        let request = Request::get(Url::parse(apod).unwrap());

        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();
        assert_eq!(response.source, ResponseSource::Network);

        let api = worker.config().namespace.bucket_name(BucketRole::Api);
        let dynamic = worker.config().namespace.bucket_name(BucketRole::Dynamic);
        assert!(worker.db().match_snapshot(&api, &request.cache_key()).await.unwrap().is_some());
        assert!(worker.db().match_snapshot(&dynamic, &request.cache_key()).await.unwrap().is_none());

        network.set_online(false);
        let offline = worker.handle_fetch(&request).await.response().cloned().unwrap();
        assert_eq!(offline.source, ResponseSource::Cache);
        assert_eq!(offline.body, response.body);
    }

    #[tokio::test]
    async fn test_api_offline_without_cache_is_json_503() {
        let network = Arc::new(ScriptedNetwork::new());
        let worker = activated_worker(network.clone(), test_config()).await;
        network.set_online(false);

        let request = Request::get(worker.resolve("/api/planets").unwrap());
        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_non_ok_network_response_is_returned_but_not_cached() {
        let network = Arc::new(ScriptedNetwork::new());
        network.route("http://localhost:8080/data/moons.xml", 500, "text/plain", "boom");
        let worker = activated_worker(network.clone(), test_config()).await;
        let request = Request::get(worker.resolve("/data/moons.xml").unwrap());

        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.source, ResponseSource::Network);
        assert!(worker.db().match_any(&request.cache_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hung_network_times_out_to_fallback() {
        let network = Arc::new(ScriptedNetwork::new());
        network.route("http://localhost:8080/pages/index.html", 200, "text/html", "<h1>cached</h1>");
        let config = WorkerConfig { network_timeout: Duration::from_millis(100), ..test_config() };
        let worker = activated_worker(network.clone(), config).await;
        let request = Request::get(worker.resolve("/pages/index.html").unwrap());
        worker.handle_fetch(&request).await;

        network.set_hang(true);
        let response = worker.handle_fetch(&request).await.response().cloned().unwrap();

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"<h1>cached</h1>");
    }

    #[tokio::test]
    async fn test_concurrent_fetches_all_resolve() {
        let network = Arc::new(ScriptedNetwork::new());
        for i in 0..8 {
            network.route(&format!("http://localhost:8080/js/widget{i}.js"), 200, "text/javascript", "ok");
        }
        let worker = Arc::new(activated_worker(network.clone(), test_config()).await);

        let mut handles = Vec::new();
        for i in 0..8 {
            let worker = worker.clone();
            handles.push(tokio::spawn(async move {
                let request = Request::get(worker.resolve(&format!("/js/widget{i}.js")).unwrap());
                worker.handle_fetch(&request).await.response().map(|r| r.status)
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(200));
        }
        let dynamic = worker.config().namespace.bucket_name(BucketRole::Dynamic);
        assert_eq!(worker.db().count_snapshots(&dynamic).await.unwrap(), 8);
    }
}
