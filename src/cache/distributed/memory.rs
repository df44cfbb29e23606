//! In-process stand-in for the distributed cache.
//!
//! Used for single-node deployments and tests. Values expire per entry via a
//! moka `Expiry`; counters live in a `DashMap` and never expire.

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use moka::policy::Expiry;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::cache::DistributedCache;
use crate::errors::Result;

#[derive(Clone)]
struct TimedValue {
    value: String,
    ttl: Duration,
}

/// 每个条目使用写入时给定的 TTL
struct PerEntryExpiry;

impl Expiry<String, TimedValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &TimedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &TimedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryDistributedCache {
    values: Cache<String, TimedValue>,
    counters: DashMap<String, i64>,
}

impl MemoryDistributedCache {
    pub fn new(max_capacity: u64) -> Self {
        let values = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();
        debug!(
            "MemoryDistributedCache initialized with max capacity: {}",
            max_capacity
        );
        Self {
            values,
            counters: DashMap::new(),
        }
    }

    /// Current counter value, `0` when never incremented.
    pub fn counter(&self, key: &str) -> i64 {
        self.counters.get(key).map(|v| *v).unwrap_or(0)
    }
}

#[async_trait]
impl DistributedCache for MemoryDistributedCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).await.map(|v| v.value))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.values
            .insert(
                key.to_string(),
                TimedValue {
                    value: value.to_string(),
                    ttl: ttl.max(Duration::from_secs(1)),
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.invalidate(key).await;
        Ok(())
    }

    async fn increment_counter(&self, key: &str, by: u64) -> Result<i64> {
        let by = i64::try_from(by).unwrap_or(i64::MAX);
        let mut entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(by);
        Ok(*entry)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryDistributedCache::new(100);
        cache
            .set_with_ttl("url:abc", "{}", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("url:abc").await.unwrap().as_deref(), Some("{}"));
        cache.delete("url:abc").await.unwrap();
        assert_eq!(cache.get("url:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryDistributedCache::new(100);
        cache
            .set_with_ttl("url:short", "x", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(cache.get("url:short").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cache.get("url:short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_counters_accumulate() {
        let cache = MemoryDistributedCache::new(100);
        assert_eq!(cache.increment_counter("counter:a", 1).await.unwrap(), 1);
        assert_eq!(cache.increment_counter("counter:a", 4).await.unwrap(), 5);
        assert_eq!(cache.counter("counter:a"), 5);
        assert_eq!(cache.counter("counter:b"), 0);
    }
}
