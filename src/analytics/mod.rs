//! 访问统计
//!
//! Redirects only enqueue a `StatEvent`; a fixed pool of workers drains the
//! queue in batches and hands aggregated deltas to a `StatSink`.

pub mod manager;
pub mod sink;

pub use manager::{StatRecorder, aggregate};
pub use sink::{StatSink, TieredStatSink};

use chrono::{DateTime, Utc};

/// 单次访问事件
#[derive(Debug, Clone)]
pub struct StatEvent {
    pub code: String,
    pub at: DateTime<Utc>,
}

impl StatEvent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            at: Utc::now(),
        }
    }
}
