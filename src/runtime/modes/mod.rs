//! Execution modes
//!
//! - `serve`: HTTP server (default)
//! - `reap`: one-shot removal of expired links

pub mod maintenance;
pub mod server;

pub use maintenance::run_reap;
pub use server::run_server;
