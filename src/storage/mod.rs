//! Durable store (L3)
//!
//! `LinkStore` is the contract the resolution pipeline depends on. The
//! sea-orm backend is the system of record; `MemoryLinkStore` backs tests
//! and throwaway single-process runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use memory::MemoryLinkStore;
pub use models::{AccessDelta, DailyStat, LinkStats, LiveKeys, ShortLink, forever_from};

/// Durable store contract.
///
/// `Ok(None)` is an authoritative miss; any `Err` is `StoreUnavailable`
/// except `insert`, which reports a taken code as `AliasConflict`.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<ShortLink>>;

    /// Most recent link for `target` that is still live at `now`.
    async fn find_live_by_target(
        &self,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortLink>>;

    async fn insert(&self, link: &ShortLink) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete(&self, code: &str) -> Result<bool>;

    /// Apply batched access counts and per-day buckets.
    async fn record_access(&self, deltas: &[AccessDelta]) -> Result<()>;

    /// Day buckets with at least one access on or after `since`, oldest first.
    async fn daily_stats(&self, code: &str, since: NaiveDate) -> Result<Vec<DailyStat>>;

    /// Physically remove links whose expiry is before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn load_live_keys(&self, now: DateTime<Utc>) -> Result<LiveKeys>;

    fn backend_name(&self) -> &str;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<dyn LinkStore>> {
        let database_url = &config.database_url;

        if database_url == "memory" {
            info!("Using in-memory link store, data is lost on exit");
            return Ok(Arc::new(MemoryLinkStore::new()));
        }

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;
        let storage = SeaOrmStorage::new(database_url, &backend_type, config).await?;
        Ok(Arc::new(storage))
    }
}
