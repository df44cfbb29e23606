//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use linkgate::analytics::StatRecorder;
use linkgate::cache::DistributedCache;
use linkgate::cache::distributed::MemoryDistributedCache;
use linkgate::errors::{LinkgateError, Result};
use linkgate::services::{LinkService, PipelineSettings};
use linkgate::storage::{
    AccessDelta, DailyStat, LinkStore, LiveKeys, MemoryLinkStore, ShortLink,
};

/// `MemoryLinkStore` with call counters and switchable failures.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryLinkStore,
    pub gets: AtomicUsize,
    pub inserts: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub reject_inserts: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkStore for CountingStore {
    async fn get(&self, code: &str) -> Result<Option<ShortLink>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LinkgateError::store_unavailable("connection refused"));
        }
        self.inner.get(code).await
    }

    async fn find_live_by_target(
        &self,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortLink>> {
        self.inner.find_live_by_target(target, now).await
    }

    async fn insert(&self, link: &ShortLink) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.reject_inserts.load(Ordering::SeqCst) {
            return Err(LinkgateError::alias_conflict("unique constraint"));
        }
        self.inner.insert(link).await
    }

    async fn delete(&self, code: &str) -> Result<bool> {
        self.inner.delete(code).await
    }

    async fn record_access(&self, deltas: &[AccessDelta]) -> Result<()> {
        self.inner.record_access(deltas).await
    }

    async fn daily_stats(&self, code: &str, since: NaiveDate) -> Result<Vec<DailyStat>> {
        self.inner.daily_stats(code, since).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.delete_expired(now).await
    }

    async fn load_live_keys(&self, now: DateTime<Utc>) -> Result<LiveKeys> {
        self.inner.load_live_keys(now).await
    }

    fn backend_name(&self) -> &str {
        "counting"
    }
}

/// Distributed cache whose every call fails.
pub struct DownCache;

#[async_trait]
impl DistributedCache for DownCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(LinkgateError::cache_unavailable("connection reset"))
    }

    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        Err(LinkgateError::cache_unavailable("connection reset"))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(LinkgateError::cache_unavailable("connection reset"))
    }

    async fn increment_counter(&self, _key: &str, _by: u64) -> Result<i64> {
        Err(LinkgateError::cache_unavailable("connection reset"))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        filter_expected_items: 10_000,
        ..PipelineSettings::default()
    }
}

pub fn service_with(
    store: Arc<dyn LinkStore>,
    cache: Arc<dyn DistributedCache>,
) -> Arc<LinkService> {
    Arc::new(LinkService::new(
        test_settings(),
        store,
        cache,
        StatRecorder::new(1_000, 64),
    )
    .expect("valid filter settings"))
}

pub fn memory_service() -> (Arc<LinkService>, Arc<CountingStore>, Arc<MemoryDistributedCache>) {
    let store = Arc::new(CountingStore::new());
    let cache = Arc::new(MemoryDistributedCache::new(10_000));
    let svc = service_with(store.clone(), cache.clone());
    (svc, store, cache)
}
