//! Install and activate.
//!
//! Install precaches the manifest into the static bucket. Activate deletes
//! every bucket of older versions and claims open pages. The host runs them
//! in that order; a second install before activation leaves the worker
//! waiting until `activate` or a skip-waiting message.

use std::sync::atomic::Ordering;

use orrery_core::{BucketRole, Error};
use serde::{Deserialize, Serialize};

use super::{ServiceWorker, WorkerState};
use crate::fetch::{Network, Request};

/// A manifest entry that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of an install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub bucket: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

impl<N: Network> ServiceWorker<N> {
    /// Move to `next` if the current state is one of `from`.
    async fn transition(&self, from: &[WorkerState], next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::WorkerState(format!("cannot enter {next:?} from {:?}", *state)));
        }
        tracing::info!(from = ?*state, to = ?next, "worker state change");
        *state = next;
        Ok(())
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        tracing::info!(from = ?*state, to = ?next, "worker state change");
        *state = next;
    }

    /// Open the current buckets and precache the manifest into `static`.
    ///
    /// Each entry is fetched with cache-busting; only 2xx responses are
    /// stored. Failures are logged and reported. With `precache_strict`
    /// any failure aborts the install and the worker becomes redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(
            &[WorkerState::Parsed, WorkerState::Installed, WorkerState::Activated, WorkerState::Redundant],
            WorkerState::Installing,
        )
        .await?;

        match self.precache().await {
            Ok(report) if report.is_complete() || !self.config.precache_strict => {
                self.set_state(WorkerState::Installed).await;
                Ok(report)
            }
            Ok(report) => {
                self.set_state(WorkerState::Redundant).await;
                let paths: Vec<&str> = report.failed.iter().map(|f| f.path.as_str()).collect();
                Err(Error::PrecacheFailed(format!(
                    "{} of {} assets: {}",
                    paths.len(),
                    self.config.precache.len(),
                    paths.join(", ")
                )))
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let namespace = &self.config.namespace;
        for role in BucketRole::ALL {
            self.db.open_bucket(&namespace.bucket_name(role)).await?;
        }

        let mut report = InstallReport { bucket: namespace.bucket_name(BucketRole::Static), ..Default::default() };

        for path in &self.config.precache {
            match self.precache_one(path).await {
                Ok(()) => report.cached.push(path.clone()),
                Err(reason) => {
                    tracing::warn!(path = %path, reason = %reason, "precache failed");
                    report.failed.push(PrecacheFailure { path: path.clone(), reason });
                }
            }
        }

        tracing::info!(
            bucket = %report.bucket,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "precache finished"
        );

        Ok(report)
    }

    async fn precache_one(&self, path: &str) -> Result<(), String> {
        let url = self.resolve(path).map_err(|e| e.to_string())?;
        let request = Request::get(url).reload();

        let response = self.fetch_network(&request).await.map_err(|e| e.to_string())?;
        if !response.is_ok() {
            return Err(format!("status {}", response.status));
        }

        if self.store(BucketRole::Static, &request, &response).await {
            Ok(())
        } else {
            Err("cache write failed".to_string())
        }
    }

    /// Delete stale buckets and take control of every open page.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;

        match self.cleanup().await {
            Ok(deleted) => {
                let claimed = self.clients.claim().await;
                self.controlling.store(true, Ordering::Release);
                self.set_state(WorkerState::Activated).await;
                tracing::info!(deleted = deleted.len(), claimed, "worker activated");
                Ok(ActivateReport { deleted, claimed })
            }
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    async fn cleanup(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.bucket_names().await? {
            if self.config.namespace.is_stale(&name) && self.db.delete_bucket(&name).await? {
                tracing::info!(bucket = %name, "deleted stale bucket");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Activate a waiting worker now. Returns None if nothing was waiting.
    pub async fn skip_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        if self.state().await != WorkerState::Installed {
            return Ok(None);
        }
        self.activate().await.map(Some)
    }
}
