use std::sync::Arc;

use tracing::warn;

use crate::cache::{DistributedCache, keys::counter_key};
use crate::storage::{AccessDelta, LinkStore};

/// 访问计数 Sink（聚合模式）
#[async_trait::async_trait]
pub trait StatSink: Send + Sync {
    async fn flush(&self, deltas: Vec<AccessDelta>) -> anyhow::Result<()>;
}

/// Writes each batch to the L2 counter and the durable store.
///
/// Counter failures only warn; the store write is still attempted.
pub struct TieredStatSink {
    cache: Arc<dyn DistributedCache>,
    store: Arc<dyn LinkStore>,
}

impl TieredStatSink {
    pub fn new(cache: Arc<dyn DistributedCache>, store: Arc<dyn LinkStore>) -> Self {
        Self { cache, store }
    }
}

#[async_trait::async_trait]
impl StatSink for TieredStatSink {
    async fn flush(&self, deltas: Vec<AccessDelta>) -> anyhow::Result<()> {
        for delta in &deltas {
            if let Err(e) = self
                .cache
                .increment_counter(&counter_key(&delta.code), delta.count)
                .await
            {
                warn!("Counter increment failed for {}: {}", delta.code, e);
            }
        }

        self.store.record_access(&deltas).await?;
        Ok(())
    }
}
