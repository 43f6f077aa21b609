//! Push messages and notification clicks.

use std::sync::atomic::Ordering;

use orrery_core::Error;
use serde::{Deserialize, Serialize};

use super::{ServiceWorker, WindowClient};
use crate::fetch::Network;

const DEFAULT_TITLE: &str = "Solar System Explorer";
const DEFAULT_BODY: &str = "New discoveries await!";
const DEFAULT_ICON: &str = "/images/icon-192.png";
const DEFAULT_URL: &str = "/";
/// Shown notifications kept before the oldest are dropped.
pub const MAX_NOTIFICATIONS: usize = 20;

/// Push payload; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub url: Option<String>,
}

/// A notification currently on display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Where a click should take the user.
    pub url: String,
    pub shown_at: String,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "client", rename_all = "lowercase")]
pub enum NotificationAction {
    Focused(WindowClient),
    Opened(WindowClient),
}

impl<N: Network> ServiceWorker<N> {
    /// Show a notification for a push.
    ///
    /// A missing payload shows the defaults. A payload that is not a JSON
    /// object of the expected shape is logged and nothing is shown.
    pub async fn handle_push(&self, data: Option<&str>) -> Option<Notification> {
        let payload = match data.map(str::trim).filter(|d| !d.is_empty()) {
            None => PushPayload::default(),
            Some(raw) => match serde_json::from_str::<PushPayload>(raw) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed push payload, not showing notification");
                    return None;
                }
            },
        };

        let notification = Notification {
            id: self.next_notification.fetch_add(1, Ordering::Relaxed) + 1,
            title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.into()),
            body: payload.body.unwrap_or_else(|| DEFAULT_BODY.into()),
            icon: payload.icon.unwrap_or_else(|| DEFAULT_ICON.into()),
            url: payload.url.unwrap_or_else(|| DEFAULT_URL.into()),
            shown_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(id = notification.id, title = %notification.title, "notification shown");
        let mut shown = self.notifications.write().await;
        shown.push(notification.clone());
        if shown.len() > MAX_NOTIFICATIONS {
            let excess = shown.len() - MAX_NOTIFICATIONS;
            shown.drain(..excess);
            tracing::debug!(dropped = excess, "oldest notifications dropped");
        }
        Some(notification)
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    /// Close the notification, then focus a page already at its URL or open one.
    pub async fn notification_click(&self, id: u64) -> Result<NotificationAction, Error> {
        let notification = {
            let mut shown = self.notifications.write().await;
            let index = shown
                .iter()
                .position(|n| n.id == id)
                .ok_or_else(|| Error::InvalidInput(format!("no notification with id {id}")))?;
            shown.remove(index)
        };

        let target = self.resolve(&notification.url)?;

        if let Some(client) = self.clients.find_by_url(&target).await
            && self.clients.focus(client.id).await
        {
            tracing::info!(id, client = client.id, url = %target, "focused existing client");
            return Ok(NotificationAction::Focused(WindowClient { focused: true, ..client }));
        }

        let client = self.clients.open_window(target).await;
        tracing::info!(id, client = client.id, url = %client.url, "opened new client");
        Ok(NotificationAction::Opened(client))
    }
}
