use std::time::Duration;

use async_trait::async_trait;

use crate::errors::Result;

/// Probabilistic negative-existence index.
///
/// - `might_contain == false` 表示**一定不存在**
/// - `might_contain == true` 表示**可能存在**
///
/// There is deliberately no remove: members share bits.
pub trait ExistenceFilter: Send + Sync {
    fn add(&self, item: &str);

    fn might_contain(&self, item: &str) -> bool;

    /// 批量写入（启动预热）
    fn bulk_add(&self, items: &[String]) {
        for item in items {
            self.add(item);
        }
    }
}

/// Shared network key/value cache (L2).
///
/// `Ok(None)` is a miss, `Err(CacheUnavailable)` a transport failure. The
/// resolution pipeline treats both as "fall through to the next tier".
#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically add `by` to an integer counter, returning the new value.
    async fn increment_counter(&self, key: &str, by: u64) -> Result<i64>;

    fn backend_name(&self) -> &'static str;

    /// Drop connections past their idle or lifetime limit. Returns how many
    /// were closed.
    async fn reap_idle(&self) -> usize {
        0
    }
}
