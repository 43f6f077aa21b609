//! Core types and shared functionality for orrery.
//!
//! This crate provides:
//! - Cache storage with SQLite backend (named buckets of response snapshots)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{BucketRole, CacheDb, CacheNamespace, Snapshot};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
