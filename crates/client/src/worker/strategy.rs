//! Caching strategies as ordered fallback plans.
//!
//! A strategy is a list of tiers. The worker evaluates them in order and
//! returns the first response one produces; the last tier is always a
//! synthesized response, so every plan terminates.

use orrery_core::BucketRole;
use serde::{Deserialize, Serialize};

use super::classify::RequestClass;

/// Strategy selected by request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    NetworkFirstWithOfflineFallback,
}

/// Synthesized terminal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Offline HTML page with a retry control.
    OfflinePage,
    /// Plain 503 for sub-resources.
    ServiceUnavailable,
    /// JSON 503 for API callers.
    OfflineApi,
}

/// One step of a fallback plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Cached copy of the exact request, from any bucket.
    Cache,
    /// Network fetch; 2xx responses are copied into the bucket of this role.
    Network(BucketRole),
    /// Cached copy of the site's home page.
    CachedHome,
    Synthesized(Fallback),
}

impl Strategy {
    pub fn for_class(class: RequestClass) -> Self {
        match class {
            RequestClass::Api | RequestClass::Other => Strategy::NetworkFirst,
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::Html => Strategy::NetworkFirstWithOfflineFallback,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
            Strategy::NetworkFirstWithOfflineFallback => "network_first_with_offline_fallback",
        }
    }
}

/// The tiers evaluated for a request of `class`, in order.
pub fn plan(class: RequestClass) -> Vec<Tier> {
    match class {
        RequestClass::Api => {
            vec![Tier::Network(BucketRole::Api), Tier::Cache, Tier::Synthesized(Fallback::OfflineApi)]
        }
        RequestClass::Other => vec![
            Tier::Network(BucketRole::Dynamic),
            Tier::Cache,
            Tier::Synthesized(Fallback::ServiceUnavailable),
        ],
        RequestClass::StaticAsset => vec![
            Tier::Cache,
            Tier::Network(BucketRole::Dynamic),
            Tier::Synthesized(Fallback::ServiceUnavailable),
        ],
        RequestClass::Html => vec![
            Tier::Network(BucketRole::Dynamic),
            Tier::Cache,
            Tier::CachedHome,
            Tier::Synthesized(Fallback::OfflinePage),
        ],
    }
}
