//! Client code for orrery.
//!
//! This crate provides the HTTP fetch pipeline and the service worker that
//! sits between pages and the network, shared by the server binary.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network, Request, Response, ResponseSource};
pub use worker::{FetchOutcome, ServiceWorker, WorkerConfig, WorkerState};
