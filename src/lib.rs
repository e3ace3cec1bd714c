//! # Orderstream
//!
//! Order ingestion pipeline: consumes order documents from Kafka, validates
//! and persists them to Postgres, and serves lookups through a cache-aside
//! Redis layer. Failures escalate through a bounded retry stream into a
//! dead-letter queue that is persisted for inspection.
//!
//! ## Architecture
//!
//! ```text
//! orders topic -> Order Consumer -> validate -> Postgres + cache
//!                      |  failure, attempt < cap
//!                      v
//!                retry topic -> Retry Relay (backoff) -> orders topic
//!                      |  failure, attempt >= cap
//!                      v
//!                dead-letter topic -> DLQ Consumer -> dead_letters table
//! ```
//!
//! ## Modules
//!
//! - [`domain`]: The order aggregate and its admission rules
//! - [`service`]: Cache-aside facade over the store
//! - [`messaging`]: Kafka consumers, publisher and failure routing
//! - [`storage`] / [`cache`]: Postgres and Redis behind trait seams
//! - [`http`]: Lookup, metrics and health endpoints

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod messaging;
pub mod metrics;
pub mod service;
pub mod shutdown;
pub mod storage;
pub mod utils;

// Re-export commonly used types at crate root
pub use domain::Order;
pub use error::OrderError;
pub use service::OrderService;
