//! Linkgate - short link resolution service
//!
//! Short codes resolve through existence filters and three tiers: an
//! in-process TTL cache, a shared distributed cache and the durable store.
//! Access statistics are written back asynchronously and a per-client
//! admission limiter guards the HTTP surface.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//!
//! # Architecture
//! - `cache`: L1 local cache, L2 distributed cache, existence filters
//! - `storage`: Durable store backends (sea-orm, in-memory)
//! - `analytics`: Access stat queue and workers
//! - `services`: Resolution pipeline and admission limiter
//! - `api`: HTTP handlers and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod analytics;
#[cfg(feature = "server")]
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
#[cfg(feature = "server")]
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
