//! Link resolution and creation
//!
//! Read path: code filter → L1 → L2 → store. Every tier hit re-checks the
//! logical expiry carried in `CachedTarget`, so a cache entry that outlives
//! its link still reports `Expired`.
//!
//! Write path: caches and filters are only touched after the store insert
//! succeeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::analytics::StatRecorder;
use crate::cache::keys::url_key;
use crate::cache::{BloomFilter, DistributedCache, ExistenceFilter, LocalCache};
use crate::config::StaticConfig;
use crate::errors::{LinkgateError, Result};
use crate::storage::{DailyStat, LinkStats, LinkStore, ShortLink, forever_from};
use crate::utils::{CodeGenerator, validate_url};

/// Days covered by `LinkStats::daily`, today included
pub const STATS_WINDOW_DAYS: u64 = 30;

// ============ DTOs ============

/// Value stored in L1 and (as JSON) in L2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTarget {
    pub target: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedTarget {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl From<&ShortLink> for CachedTarget {
    fn from(link: &ShortLink) -> Self {
        Self {
            target: link.target.clone(),
            expires_at: link.expires_at,
        }
    }
}

/// Tier that answered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Local,
    Distributed,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub target: String,
    pub custom_code: Option<String>,
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub link: ShortLink,
    /// `false` when an existing live link for the target was returned
    pub created: bool,
}

/// Pipeline knobs derived from `StaticConfig`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub code_length: usize,
    pub max_attempts: u32,
    pub content_fallback: bool,
    pub local_ttl: Duration,
    pub local_max_entries: usize,
    pub filter_expected_items: usize,
    pub filter_fp_rate: f64,
}

impl From<&StaticConfig> for PipelineSettings {
    fn from(config: &StaticConfig) -> Self {
        Self {
            code_length: config.code.length,
            max_attempts: config.code.max_attempts,
            content_fallback: config.code.content_fallback,
            local_ttl: Duration::from_secs(config.cache.local.backfill_ttl_secs),
            local_max_entries: config.cache.local.max_entries,
            filter_expected_items: config.filter.expected_items,
            filter_fp_rate: config.filter.false_positive_rate,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&StaticConfig::default())
    }
}

// ============ LinkService ============

pub struct LinkService {
    settings: PipelineSettings,
    generator: CodeGenerator,
    code_filter: Arc<dyn ExistenceFilter>,
    target_filter: Arc<dyn ExistenceFilter>,
    local: Arc<LocalCache<CachedTarget>>,
    cache: Arc<dyn DistributedCache>,
    store: Arc<dyn LinkStore>,
    stats: StatRecorder,
}

impl LinkService {
    pub fn new(
        settings: PipelineSettings,
        store: Arc<dyn LinkStore>,
        cache: Arc<dyn DistributedCache>,
        stats: StatRecorder,
    ) -> Result<Self> {
        let code_filter = Arc::new(BloomFilter::new(
            settings.filter_expected_items,
            settings.filter_fp_rate,
        )?);
        let target_filter = Arc::new(BloomFilter::new(
            settings.filter_expected_items,
            settings.filter_fp_rate,
        )?);
        Ok(Self::with_filters(
            settings,
            store,
            cache,
            stats,
            code_filter,
            target_filter,
        ))
    }

    pub fn with_filters(
        settings: PipelineSettings,
        store: Arc<dyn LinkStore>,
        cache: Arc<dyn DistributedCache>,
        stats: StatRecorder,
        code_filter: Arc<dyn ExistenceFilter>,
        target_filter: Arc<dyn ExistenceFilter>,
    ) -> Self {
        Self {
            generator: CodeGenerator::new(settings.code_length),
            local: Arc::new(LocalCache::new(settings.local_max_entries)),
            settings,
            code_filter,
            target_filter,
            cache,
            store,
            stats,
        }
    }

    pub fn local_cache(&self) -> &Arc<LocalCache<CachedTarget>> {
        &self.local
    }

    pub fn distributed_cache(&self) -> &Arc<dyn DistributedCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn LinkStore> {
        &self.store
    }

    pub fn stat_recorder(&self) -> &StatRecorder {
        &self.stats
    }

    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }

    // ============ Read path ============

    pub async fn resolve(&self, code: &str) -> Result<Resolution> {
        if !self.generator.validate(code) {
            return Err(LinkgateError::invalid_input(format!(
                "'{}' is not a valid short code",
                code
            )));
        }

        if !self.code_filter.might_contain(code) {
            trace!("Code filter rejected {}", code);
            return Err(LinkgateError::not_found(format!("short code '{}' not found", code)));
        }

        let now = Utc::now();

        if let Some(cached) = self.local.get(code) {
            trace!("L1 hit: {}", code);
            return self.serve_cached(code, cached, Tier::Local, now).await;
        }

        match self.cache.get(&url_key(code)).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedTarget>(&raw) {
                Ok(cached) => {
                    debug!("L2 hit: {}", code);
                    if !cached.is_expired_at(now) {
                        self.local
                            .set(code, cached.clone(), Some(self.settings.local_ttl));
                    }
                    return self.serve_cached(code, cached, Tier::Distributed, now).await;
                }
                Err(e) => warn!("Discarding unreadable L2 entry for {}: {}", code, e),
            },
            Ok(None) => debug!("L2 miss: {}", code),
            Err(e) => warn!("L2 unavailable for {}, falling through to store: {}", code, e),
        }

        match self.store.get(code).await? {
            None => {
                debug!("Store miss: {}", code);
                Err(LinkgateError::not_found(format!("short code '{}' not found", code)))
            }
            Some(link) if link.is_expired_at(now) => {
                debug!("Store hit for expired code: {}", code);
                Err(LinkgateError::expired(format!("short code '{}' has expired", code)))
            }
            Some(link) => {
                debug!("Store hit: {}", code);
                self.populate_caches(&link, now).await;
                self.stats.record(code);
                Ok(Resolution {
                    target: link.target,
                    tier: Tier::Store,
                })
            }
        }
    }

    async fn serve_cached(
        &self,
        code: &str,
        cached: CachedTarget,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        if cached.is_expired_at(now) {
            debug!("Cached entry for {} is past its expiry, evicting", code);
            self.evict(code).await;
            return Err(LinkgateError::expired(format!("short code '{}' has expired", code)));
        }

        self.stats.record(code);
        Ok(Resolution {
            target: cached.target,
            tier,
        })
    }

    /// L2 gets the remaining lifetime, L1 the fixed backfill TTL.
    async fn populate_caches(&self, link: &ShortLink, now: DateTime<Utc>) {
        let Ok(remaining) = (link.expires_at - now).to_std() else {
            return;
        };
        let cached = CachedTarget::from(link);

        match serde_json::to_string(&cached) {
            Ok(json) => {
                if let Err(e) = self
                    .cache
                    .set_with_ttl(&url_key(&link.code), &json, remaining)
                    .await
                {
                    warn!("L2 backfill failed for {}: {}", link.code, e);
                }
            }
            Err(e) => warn!("Failed to encode cache entry for {}: {}", link.code, e),
        }

        self.local
            .set(&link.code, cached, Some(self.settings.local_ttl));
    }

    async fn evict(&self, code: &str) {
        self.local.delete(code);
        if let Err(e) = self.cache.delete(&url_key(code)).await {
            warn!("L2 eviction failed for {}: {}", code, e);
        }
    }

    // ============ Write path ============

    pub async fn create(&self, req: CreateRequest) -> Result<CreateOutcome> {
        let target = validate_url(&req.target)?.to_string();

        let now = Utc::now();
        let expires_at = match req.ttl_seconds {
            Some(0) => {
                return Err(LinkgateError::invalid_input("ttl_seconds must be positive"));
            }
            Some(ttl) => i64::try_from(ttl)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .ok_or_else(|| LinkgateError::invalid_input("ttl_seconds is out of range"))?,
            None => forever_from(now),
        };

        let custom_code = req.custom_code.filter(|c| !c.is_empty());
        if let Some(code) = &custom_code
            && !self.generator.validate(code)
        {
            return Err(LinkgateError::invalid_input(format!(
                "custom code must be {} characters of [A-Za-z0-9]",
                self.generator.length()
            )));
        }

        // 同一目标已有未过期短码时直接返回，自定义短码不会被绑定
        if self.target_filter.might_contain(&target)
            && let Some(existing) = self.store.find_live_by_target(&target, now).await?
        {
            debug!("Returning existing code {} for {}", existing.code, target);
            return Ok(CreateOutcome {
                link: existing,
                created: false,
            });
        }

        let link = match custom_code {
            Some(code) => {
                let link = ShortLink::new(code, target, now, expires_at);
                self.insert_custom(&link, now).await?;
                link
            }
            None => self.insert_generated(&target, now, expires_at).await?,
        };

        self.code_filter.add(&link.code);
        self.target_filter.add(&link.target);
        self.populate_caches(&link, now).await;

        info!("Short link created: {} -> {}", link.code, link.target);
        Ok(CreateOutcome {
            link,
            created: true,
        })
    }

    /// A live binding is a conflict; an expired one is removed and rebound.
    async fn insert_custom(&self, link: &ShortLink, now: DateTime<Utc>) -> Result<()> {
        if self.code_filter.might_contain(&link.code) {
            self.release_if_expired(&link.code, now).await?;
        }

        match self.store.insert(link).await {
            Err(LinkgateError::AliasConflict(_)) => {
                // The filter only knows live codes; an expired row may still hold the key.
                self.release_if_expired(&link.code, now).await?;
                self.store.insert(link).await
            }
            other => other,
        }
    }

    async fn release_if_expired(&self, code: &str, now: DateTime<Utc>) -> Result<()> {
        match self.store.get(code).await? {
            Some(existing) if !existing.is_expired_at(now) => Err(LinkgateError::alias_conflict(
                format!("code '{}' is already bound", code),
            )),
            Some(_) => {
                debug!("Rebinding expired code {}", code);
                self.store.delete(code).await?;
                self.evict(code).await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Random codes with a bounded budget. A filter hit that the store
    /// disproves does not cost an attempt.
    async fn insert_generated(
        &self,
        target: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<ShortLink> {
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let code = if self.settings.content_fallback && max_attempts > 1 && attempt == max_attempts
            {
                let seed = format!("{}{}", target, now.timestamp_nanos_opt().unwrap_or_default());
                self.generator.derive_from_content(&seed)
            } else {
                self.generator.generate()
            };

            if self.code_filter.might_contain(&code) {
                if self.store.get(&code).await?.is_some() {
                    debug!("Generated code {} collides (attempt {})", code, attempt);
                    continue;
                }
                trace!("Filter false positive for {}", code);
            }

            let link = ShortLink::new(code, target, now, expires_at);
            match self.store.insert(&link).await {
                Ok(()) => return Ok(link),
                Err(LinkgateError::AliasConflict(_)) => {
                    debug!("Lost insert race for {} (attempt {})", link.code, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Code generation exhausted after {} attempts", max_attempts);
        Err(LinkgateError::generation_exhausted(format!(
            "no free code after {} attempts",
            max_attempts
        )))
    }

    // ============ Stats & maintenance ============

    /// Totals plus a zero-filled daily breakdown, oldest first. Expired links
    /// still report.
    pub async fn stats(&self, code: &str) -> Result<LinkStats> {
        if !self.generator.validate(code) {
            return Err(LinkgateError::invalid_input(format!(
                "'{}' is not a valid short code",
                code
            )));
        }

        let link = self
            .store
            .get(code)
            .await?
            .ok_or_else(|| LinkgateError::not_found(format!("short code '{}' not found", code)))?;

        let today = Utc::now().date_naive();
        let since = today
            .checked_sub_days(Days::new(STATS_WINDOW_DAYS - 1))
            .unwrap_or(today);
        let buckets = self.store.daily_stats(code, since).await?;

        let daily = since
            .iter_days()
            .take(STATS_WINDOW_DAYS as usize)
            .map(|date| DailyStat {
                date,
                count: buckets
                    .iter()
                    .find(|b| b.date == date)
                    .map(|b| b.count)
                    .unwrap_or(0),
            })
            .collect();

        Ok(LinkStats {
            code: link.code,
            total_access: link.access_count,
            last_access_at: link.last_access_at,
            daily,
        })
    }

    /// Load every live code and target into the filters.
    pub async fn warm_filters(&self) -> Result<usize> {
        let keys = self.store.load_live_keys(Utc::now()).await?;
        self.code_filter.bulk_add(&keys.codes);
        self.target_filter.bulk_add(&keys.targets);
        info!("Existence filters warmed with {} live links", keys.codes.len());
        Ok(keys.codes.len())
    }

    /// Physically remove expired links from the store.
    pub async fn reap_expired(&self) -> Result<u64> {
        self.store.delete_expired(Utc::now()).await
    }
}
