//! Request classification.
//!
//! Checks run in a fixed order: API allowlist, then static-asset extension,
//! then document detection. Anything unmatched is `Other`. The result only
//! depends on the request, so the same request always lands in the same class.

use serde::{Deserialize, Serialize};

use crate::fetch::{Destination, Request};

/// Handling category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Api,
    StaticAsset,
    Html,
    Other,
}

impl RequestClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Api => "api",
            RequestClass::StaticAsset => "static_asset",
            RequestClass::Html => "html",
            RequestClass::Other => "other",
        }
    }
}

/// Allowlist-driven classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    api_patterns: Vec<String>,
    static_extensions: Vec<String>,
}

impl Classifier {
    pub fn new(api_patterns: Vec<String>, static_extensions: Vec<String>) -> Self {
        let static_extensions = static_extensions.into_iter().map(|e| e.to_ascii_lowercase()).collect();
        Self { api_patterns, static_extensions }
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        if self.is_api(request) {
            RequestClass::Api
        } else if self.is_static_asset(request) {
            RequestClass::StaticAsset
        } else if is_document(request) {
            RequestClass::Html
        } else {
            RequestClass::Other
        }
    }

    /// Host or path contains one of the API patterns.
    fn is_api(&self, request: &Request) -> bool {
        let host = request.url.host_str().unwrap_or("");
        let path = request.url.path();
        self.api_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| host.contains(p.as_str()) || path.contains(p.as_str()))
    }

    /// Path ends with one of the static extensions, case-insensitively.
    fn is_static_asset(&self, request: &Request) -> bool {
        let path = request.url.path().to_ascii_lowercase();
        self.static_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }
}

fn is_document(request: &Request) -> bool {
    request.destination == Destination::Document
        || request
            .header("accept")
            .is_some_and(|accept| accept.contains("text/html"))
}
