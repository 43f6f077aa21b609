//! SQLite-backed cache storage for response snapshots.
//!
//! This module provides named, persistent cache buckets using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Bucket lifecycle (open, enumerate, delete) keyed by a versioned namespace
//! - Request-keyed response snapshots using SHA-256 cache keys
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Maintenance purges (domain, LRU)

pub mod buckets;
pub mod connection;
pub mod hash;
pub mod migrations;
pub mod namespace;
pub mod snapshots;

pub use crate::Error;

pub use buckets::BucketInfo;
pub use connection::CacheDb;
pub use namespace::{BucketRole, CacheNamespace};
pub use snapshots::Snapshot;
