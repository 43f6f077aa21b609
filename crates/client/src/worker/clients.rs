//! Registry of open pages the worker can control, focus, or open.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

/// An open page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: u64,
    pub url: Url,
    pub focused: bool,
    /// Whether the active worker intercepts this page's fetches.
    pub controlled: bool,
}

/// Open pages, shared by all worker event handlers.
#[derive(Debug, Default)]
pub struct Clients {
    windows: RwLock<Vec<WindowClient>>,
    next_id: AtomicU64,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a page that loaded without a controlling worker.
    pub async fn register(&self, url: Url) -> WindowClient {
        let client = WindowClient { id: self.next_id(), url, focused: false, controlled: false };
        self.windows.write().await.push(client.clone());
        client
    }

    /// Take control of every open page. Returns how many were newly claimed.
    pub async fn claim(&self) -> usize {
        let mut windows = self.windows.write().await;
        let mut claimed = 0;
        for window in windows.iter_mut().filter(|w| !w.controlled) {
            window.controlled = true;
            claimed += 1;
        }
        claimed
    }

    pub async fn list(&self) -> Vec<WindowClient> {
        self.windows.read().await.clone()
    }

    /// First open page showing exactly `url`.
    pub async fn find_by_url(&self, url: &Url) -> Option<WindowClient> {
        self.windows.read().await.iter().find(|w| &w.url == url).cloned()
    }

    /// Focus one page and blur the others. Returns false for unknown ids.
    pub async fn focus(&self, id: u64) -> bool {
        let mut windows = self.windows.write().await;
        if !windows.iter().any(|w| w.id == id) {
            return false;
        }
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        true
    }

    /// Open a new focused page, controlled from the start.
    pub async fn open_window(&self, url: Url) -> WindowClient {
        let mut windows = self.windows.write().await;
        for window in windows.iter_mut() {
            window.focused = false;
        }
        let client = WindowClient { id: self.next_id(), url, focused: true, controlled: true };
        windows.push(client.clone());
        client
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}
