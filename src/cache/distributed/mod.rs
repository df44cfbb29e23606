pub mod memory;
pub mod pool;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::DistributedCache;
use crate::config::DistributedCacheConfig;
use crate::errors::{LinkgateError, Result};

pub use memory::MemoryDistributedCache;
pub use pool::{PoolSettings, RedisPool};
pub use redis::RedisDistributedCache;

/// Build the L2 adapter named by `cache.distributed.backend`.
pub async fn create_distributed_cache(
    config: &DistributedCacheConfig,
) -> Result<Arc<dyn DistributedCache>> {
    match config.backend.as_str() {
        "redis" => {
            let settings = PoolSettings {
                size: config.pool_size,
                idle_timeout: Duration::from_secs(config.idle_timeout_secs),
                max_lifetime: Duration::from_secs(config.max_lifetime_secs),
                ..PoolSettings::default()
            };
            let cache = RedisDistributedCache::new(&config.url, &config.key_prefix, settings)?;
            match cache.ping().await {
                Ok(()) => info!("Distributed cache: redis at {}", config.url),
                Err(e) => warn!(
                    "Redis at {} is not reachable yet ({}), resolution falls through to the store until it is",
                    config.url, e
                ),
            }
            Ok(Arc::new(cache))
        }
        "memory" => {
            info!(
                "Distributed cache: in-process memory backend (capacity {})",
                config.memory_capacity
            );
            Ok(Arc::new(MemoryDistributedCache::new(config.memory_capacity)))
        }
        other => Err(LinkgateError::configuration(format!(
            "Unknown distributed cache backend '{}'",
            other
        ))),
    }
}
