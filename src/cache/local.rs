//! 进程内 TTL 缓存（L1）
//!
//! A `HashMap` behind a `parking_lot::RwLock`. Lookups share the read lock
//! and never evict; expired entries are reported absent and left for the
//! periodic sweep (`purge_expired`). `max_entries == 0` means unbounded.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// `expires_at_nanos <= 0` never expires in this tier.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at_nanos: i64,
}

impl<V> CacheEntry<V> {
    #[inline]
    fn is_expired(&self, now_nanos: i64) -> bool {
        self.expires_at_nanos > 0 && self.expires_at_nanos <= now_nanos
    }
}

pub struct LocalCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    max_entries: usize,
}

fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

fn deadline(ttl: Option<Duration>) -> i64 {
    match ttl {
        Some(ttl) if !ttl.is_zero() => {
            let ttl_nanos = i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX);
            now_nanos().saturating_add(ttl_nanos)
        }
        _ => 0,
    }
}

impl<V: Clone + Send + Sync + 'static> LocalCache<V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    /// `ttl == None` (or zero) stores without expiry.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            expires_at_nanos: deadline(ttl),
        };

        let mut entries = self.entries.write();
        if self.max_entries > 0
            && entries.len() >= self.max_entries
            && !entries.contains_key(key)
        {
            let now = now_nanos();
            entries.retain(|_, e| !e.is_expired(now));
            if entries.len() >= self.max_entries {
                trace!("L1 full ({} entries), skipping insert of {}", entries.len(), key);
                return;
            }
        }
        entries.insert(key.to_string(), entry);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(now_nanos()) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = now_nanos();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Entries held, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Spawn the periodic expiry sweep. Runs until the runtime shuts down.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即返回，跳过
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(
                        "L1 sweep removed {} expired entries, {} remain",
                        removed,
                        cache.len()
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let cache = LocalCache::new(0);
        cache.set("a", "1".to_string(), None);
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        cache.delete("a");
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let cache = LocalCache::new(0);
        cache.set("a", 1u32, Some(Duration::ZERO));
        let entries = cache.entries.read();
        assert_eq!(entries["a"].expires_at_nanos, 0);
    }

    #[tokio::test]
    async fn test_lazy_expiry_keeps_entry_until_sweep() {
        let cache = LocalCache::new(0);
        cache.set("short", 1u32, Some(Duration::from_millis(20)));
        cache.set("long", 2u32, Some(Duration::from_secs(60)));
        cache.set("forever", 3u32, None);
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get("short"), None);
        // 惰性过期：读到过期数据不会删除
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("forever"), Some(3));
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = Arc::new(LocalCache::new(0));
        cache.set("a", 1u32, Some(Duration::from_millis(10)));
        let handle = cache.spawn_sweeper(Duration::from_millis(25));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.len(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_bounded_cache_purges_then_skips() {
        let cache = LocalCache::new(2);
        cache.set("a", 1u32, Some(Duration::from_millis(10)));
        cache.set("b", 2u32, None);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // "a" 已过期，写入前会被清理
        cache.set("c", 3u32, None);
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);

        // 满了且没有可清理项，跳过写入
        cache.set("d", 4u32, None);
        assert_eq!(cache.get("d"), None);

        // 覆盖已有 key 不受上限影响
        cache.set("b", 20u32, None);
        assert_eq!(cache.get("b"), Some(20));
    }

    #[tokio::test]
    async fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(LocalCache::new(0));
        let mut handles = Vec::new();
        for t in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..500 {
                    let key = format!("{}-{}", t, i % 50);
                    cache.set(&key, i, Some(Duration::from_secs(60)));
                    assert!(cache.get(&key).is_some());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len(), 8 * 50);
    }
}
