//! Runtime control messages posted by pages.

use orrery_core::{BucketRole, Error};
use serde::{Deserialize, Serialize};

use super::{ActivateReport, ServiceWorker};
use crate::fetch::{Network, Request};

/// A message a page can post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate a waiting worker immediately.
    SkipWaiting,
    /// Refetch these URLs and overwrite their dynamic entries.
    CacheUpdate { urls: Vec<String> },
}

impl ClientMessage {
    pub fn parse(value: &serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value.clone()).map_err(|e| Error::InvalidMessage(format!("{value}: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFailure {
    pub url: String,
    pub reason: String,
}

/// What handling a message did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageReply {
    SkipWaiting { activated: Option<ActivateReport> },
    CacheUpdate { updated: Vec<String>, failed: Vec<UpdateFailure> },
}

impl<N: Network> ServiceWorker<N> {
    /// Decode and apply a message posted by a page.
    pub async fn handle_message(&self, value: &serde_json::Value) -> Result<MessageReply, Error> {
        match ClientMessage::parse(value)? {
            ClientMessage::SkipWaiting => {
                let activated = self.skip_waiting().await?;
                Ok(MessageReply::SkipWaiting { activated })
            }
            ClientMessage::CacheUpdate { urls } => {
                let (updated, failed) = self.update_cache(&urls).await;
                Ok(MessageReply::CacheUpdate { updated, failed })
            }
        }
    }

    /// Refetch each URL bypassing HTTP caches and overwrite its dynamic entry.
    ///
    /// Non-2xx responses and network failures leave the existing entry alone.
    pub async fn update_cache(&self, urls: &[String]) -> (Vec<String>, Vec<UpdateFailure>) {
        let mut updated = Vec::new();
        let mut failed = Vec::new();

        for input in urls {
            match self.update_one(input).await {
                Ok(()) => updated.push(input.clone()),
                Err(reason) => {
                    tracing::warn!(url = %input, reason = %reason, "cache update failed");
                    failed.push(UpdateFailure { url: input.clone(), reason });
                }
            }
        }

        tracing::info!(updated = updated.len(), failed = failed.len(), "cache update finished");
        (updated, failed)
    }

    async fn update_one(&self, input: &str) -> Result<(), String> {
        let url = self.resolve(input).map_err(|e| e.to_string())?;
        let request = Request::get(url).reload();

        let response = self.fetch_network(&request).await.map_err(|e| e.to_string())?;
        if !response.is_ok() {
            return Err(format!("status {}", response.status));
        }
        if self.store(BucketRole::Dynamic, &request, &response).await {
            Ok(())
        } else {
            Err("cache write failed".to_string())
        }
    }
}
