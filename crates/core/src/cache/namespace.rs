//! Versioned bucket naming.
//!
//! Bucket names follow `<app-name>-<version>-<role>`. A bucket belongs to the
//! app when its name has exactly that shape for some dash-free version and a
//! known role; only the three names of the current version are live.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Role of a cache bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BucketRole {
    /// Precached at install time, immutable until a new version deploys.
    Static,
    /// Populated on demand from successful network fetches.
    Dynamic,
    /// Like dynamic, scoped to API calls.
    Api,
}

impl BucketRole {
    pub const ALL: [BucketRole; 3] = [BucketRole::Static, BucketRole::Dynamic, BucketRole::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            BucketRole::Static => "static",
            BucketRole::Dynamic => "dynamic",
            BucketRole::Api => "api",
        }
    }
}

impl fmt::Display for BucketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(BucketRole::Static),
            "dynamic" => Ok(BucketRole::Dynamic),
            "api" => Ok(BucketRole::Api),
            other => Err(Error::InvalidInput(format!("unknown bucket role: {other}"))),
        }
    }
}

/// Bucket namespace for one app version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamespace {
    app_name: String,
    version: String,
}

impl CacheNamespace {
    pub fn new(app_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { app_name: app_name.into(), version: version.into() }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the current bucket for `role`.
    pub fn bucket_name(&self, role: BucketRole) -> String {
        format!("{}-{}-{}", self.app_name, self.version, role)
    }

    /// The three live bucket names, in role order.
    pub fn current_names(&self) -> [String; 3] {
        BucketRole::ALL.map(|role| self.bucket_name(role))
    }

    /// Whether `name` is `<app>-<version>-<role>` for this app and any version.
    ///
    /// Versions never contain a dash, so the remainder after the app name
    /// splits into exactly one version and one known role.
    pub fn owns(&self, name: &str) -> bool {
        name.strip_prefix(&self.app_name)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|rest| rest.split_once('-'))
            .is_some_and(|(version, role)| !version.is_empty() && role.parse::<BucketRole>().is_ok())
    }

    /// Live bucket names in lookup order: fresh copies in `dynamic` and
    /// `api` shadow the install-time copy in `static`.
    pub fn lookup_order(&self) -> Vec<String> {
        [BucketRole::Dynamic, BucketRole::Api, BucketRole::Static]
            .into_iter()
            .map(|role| self.bucket_name(role))
            .collect()
    }

    /// Whether `name` is one of the live buckets.
    pub fn is_current(&self, name: &str) -> bool {
        BucketRole::ALL.iter().any(|role| self.bucket_name(*role) == name)
    }

    /// Whether `name` belongs to this app but to another version.
    pub fn is_stale(&self, name: &str) -> bool {
        self.owns(name) && !self.is_current(name)
    }

    /// Role of a live bucket name.
    pub fn role_of(&self, name: &str) -> Option<BucketRole> {
        BucketRole::ALL.into_iter().find(|role| self.bucket_name(*role) == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_names() {
        let ns = CacheNamespace::new("solar-system-explorer", "v1");
        assert_eq!(ns.bucket_name(BucketRole::Static), "solar-system-explorer-v1-static");
        assert_eq!(ns.bucket_name(BucketRole::Dynamic), "solar-system-explorer-v1-dynamic");
        assert_eq!(ns.bucket_name(BucketRole::Api), "solar-system-explorer-v1-api");
    }

    #[test]
    fn test_stale_detection() {
        let ns = CacheNamespace::new("solar-system-explorer", "v2");
        assert!(ns.is_stale("solar-system-explorer-v1-static"));
        assert!(ns.is_stale("solar-system-explorer-v1-api"));
        assert!(!ns.is_stale("solar-system-explorer-v2-dynamic"));
        assert!(!ns.is_stale("another-site-v1-static"));
    }

    #[test]
    fn test_owns_requires_separator() {
        let ns = CacheNamespace::new("solar", "v1");
        assert!(ns.owns("solar-v1-static"));
        assert!(!ns.owns("solarwinds-v1-static"));
        assert!(!ns.owns("solar"));
    }

    #[test]
    fn test_owns_rejects_longer_app_names() {
        let ns = CacheNamespace::new("solar", "v2");
        assert!(ns.owns("solar-v1-dynamic"));
        assert!(!ns.owns("solar-system-explorer-v1-static"));
        assert!(!ns.is_stale("solar-system-explorer-v1-static"));
        assert!(!ns.owns("solar-v1-images"));
        assert!(!ns.owns("solar--static"));
        assert!(!ns.owns("solar-v1"));
    }

    #[test]
    fn test_lookup_order_prefers_runtime_buckets() {
        let ns = CacheNamespace::new("app", "v1");
        assert_eq!(ns.lookup_order(), vec!["app-v1-dynamic", "app-v1-api", "app-v1-static"]);
    }

    #[test]
    fn test_role_round_trip_and_lookup() {
        let ns = CacheNamespace::new("app", "v3");
        for role in BucketRole::ALL {
            assert_eq!(role.as_str().parse::<BucketRole>().unwrap(), role);
            assert_eq!(ns.role_of(&ns.bucket_name(role)), Some(role));
        }
        assert!("images".parse::<BucketRole>().is_err());
        assert_eq!(ns.role_of("app-v2-static"), None);
    }
}
