use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, error, trace};

use super::pool::{PoolSettings, RedisPool};
use crate::cache::DistributedCache;
use crate::errors::{LinkgateError, Result};

pub struct RedisDistributedCache {
    pool: RedisPool,
    key_prefix: String,
}

impl RedisDistributedCache {
    /// Build the adapter. No connection is made until first use, so a Redis
    /// outage at startup degrades to store-only resolution instead of
    /// aborting.
    pub fn new(url: &str, key_prefix: &str, settings: PoolSettings) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            LinkgateError::configuration(format!("Invalid Redis URL '{}': {}", url, e))
        })?;

        debug!(
            "RedisDistributedCache created with prefix '{}', pool size {}, idle timeout {:?}, max lifetime {:?}",
            key_prefix, settings.size, settings.idle_timeout, settings.max_lifetime
        );

        Ok(Self {
            pool: RedisPool::new(client, settings),
            key_prefix: key_prefix.to_string(),
        })
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Probe connectivity, used by startup to log the L2 state.
    pub async fn ping(&self) -> Result<()> {
        let mut checkout = self.pool.get().await?;
        let result: redis::RedisResult<String> =
            redis::cmd("PING").query_async(&mut checkout.conn).await;
        if let Err(e) = result {
            self.pool.invalidate(checkout.slot).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }
}

/// PSETEX 毫秒数，不足 1ms 按 1ms 计
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl DistributedCache for RedisDistributedCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let redis_key = self.make_key(key);
        let mut checkout = self.pool.get().await.inspect_err(|e| {
            error!("Failed to get Redis connection: {}", e);
        })?;

        match checkout.conn.get::<_, Option<String>>(&redis_key).await {
            Ok(value) => {
                trace!("Redis GET {} -> hit: {}", key, value.is_some());
                Ok(value)
            }
            Err(e) => {
                error!("Failed to get key '{}': {}", key, e);
                self.pool.invalidate(checkout.slot).await;
                Err(e.into())
            }
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let redis_key = self.make_key(key);
        let millis = ttl_millis(ttl);
        let mut checkout = self.pool.get().await?;

        if let Err(e) = checkout
            .conn
            .pset_ex::<_, _, ()>(&redis_key, value, millis)
            .await
        {
            error!("Failed to set key '{}': {}", key, e);
            self.pool.invalidate(checkout.slot).await;
            return Err(e.into());
        }
        trace!("Redis PSETEX {} ({}ms)", key, millis);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let redis_key = self.make_key(key);
        let mut checkout = self.pool.get().await?;

        if let Err(e) = checkout.conn.del::<_, usize>(&redis_key).await {
            error!("Failed to delete key '{}': {}", key, e);
            self.pool.invalidate(checkout.slot).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn increment_counter(&self, key: &str, by: u64) -> Result<i64> {
        let redis_key = self.make_key(key);
        let mut checkout = self.pool.get().await?;

        match checkout.conn.incr::<_, _, i64>(&redis_key, by).await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!("Failed to increment counter '{}': {}", key, e);
                self.pool.invalidate(checkout.slot).await;
                Err(e.into())
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn reap_idle(&self) -> usize {
        self.pool.reap_idle().await
    }
}
