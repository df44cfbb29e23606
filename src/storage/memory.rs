//! DashMap-backed link store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{AccessDelta, DailyStat, LinkStore, LiveKeys, ShortLink};
use crate::errors::{LinkgateError, Result};

#[derive(Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, ShortLink>,
    daily: DashMap<(String, NaiveDate), u64>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, code: &str) -> Result<Option<ShortLink>> {
        Ok(self.links.get(code).map(|l| l.clone()))
    }

    async fn find_live_by_target(
        &self,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortLink>> {
        Ok(self
            .links
            .iter()
            .filter(|l| l.target == target && !l.is_expired_at(now))
            .max_by_key(|l| l.created_at)
            .map(|l| l.clone()))
    }

    async fn insert(&self, link: &ShortLink) -> Result<()> {
        match self.links.entry(link.code.clone()) {
            Entry::Occupied(_) => Err(LinkgateError::alias_conflict(format!(
                "Short code '{}' already exists",
                link.code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(link.clone());
                Ok(())
            }
        }
    }

    async fn delete(&self, code: &str) -> Result<bool> {
        Ok(self.links.remove(code).is_some())
    }

    async fn record_access(&self, deltas: &[AccessDelta]) -> Result<()> {
        for delta in deltas {
            // 链接不存在时不生成日桶
            let Some(mut link) = self.links.get_mut(&delta.code) else {
                continue;
            };
            link.access_count = link.access_count.saturating_add(delta.count);
            link.last_access_at = Some(delta.last_access_at);
            drop(link);
            *self
                .daily
                .entry((delta.code.clone(), delta.last_access_at.date_naive()))
                .or_insert(0) += delta.count;
        }
        Ok(())
    }

    async fn daily_stats(&self, code: &str, since: NaiveDate) -> Result<Vec<DailyStat>> {
        let mut stats: Vec<DailyStat> = self
            .daily
            .iter()
            .filter(|e| e.key().0 == code && e.key().1 >= since)
            .map(|e| DailyStat {
                date: e.key().1,
                count: *e.value(),
            })
            .collect();
        stats.sort_by_key(|s| s.date);
        Ok(stats)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.links.len();
        self.links.retain(|_, link| link.expires_at >= now);
        Ok((before - self.links.len()) as u64)
    }

    async fn load_live_keys(&self, now: DateTime<Utc>) -> Result<LiveKeys> {
        let mut keys = LiveKeys::default();
        for link in self.links.iter().filter(|l| !l.is_expired_at(now)) {
            keys.codes.push(link.code.clone());
            keys.targets.push(link.target.clone());
        }
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(code: &str, target: &str, ttl_secs: i64) -> ShortLink {
        let now = Utc::now();
        ShortLink::new(code, target, now, now + Duration::seconds(ttl_secs))
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_alias_conflict() {
        let store = MemoryLinkStore::new();
        store.insert(&link("abc1234", "https://a.com", 60)).await.unwrap();
        let err = store
            .insert(&link("abc1234", "https://b.com", 60))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkgateError::AliasConflict(_)));
        assert_eq!(
            store.get("abc1234").await.unwrap().unwrap().target,
            "https://a.com"
        );
    }

    #[tokio::test]
    async fn test_find_live_by_target_skips_expired() {
        let store = MemoryLinkStore::new();
        store.insert(&link("old0001", "https://a.com", -10)).await.unwrap();
        let now = Utc::now();
        assert!(store.find_live_by_target("https://a.com", now).await.unwrap().is_none());

        store.insert(&link("new0001", "https://a.com", 60)).await.unwrap();
        let found = store.find_live_by_target("https://a.com", now).await.unwrap();
        assert_eq!(found.unwrap().code, "new0001");
    }

    #[tokio::test]
    async fn test_record_access_and_daily_stats() {
        let store = MemoryLinkStore::new();
        store.insert(&link("abc1234", "https://a.com", 60)).await.unwrap();
        let now = Utc::now();
        let yesterday = now - Duration::days(1);
        store
            .record_access(&[
                AccessDelta {
                    code: "abc1234".into(),
                    count: 2,
                    last_access_at: yesterday,
                },
                AccessDelta {
                    code: "abc1234".into(),
                    count: 3,
                    last_access_at: now,
                },
            ])
            .await
            .unwrap();

        let stored = store.get("abc1234").await.unwrap().unwrap();
        assert_eq!(stored.access_count, 5);
        assert_eq!(stored.last_access_at, Some(now));

        let daily = store
            .daily_stats("abc1234", yesterday.date_naive())
            .await
            .unwrap();
        assert_eq!(
            daily,
            vec![
                DailyStat {
                    date: yesterday.date_naive(),
                    count: 2
                },
                DailyStat {
                    date: now.date_naive(),
                    count: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_expired_and_live_keys() {
        let store = MemoryLinkStore::new();
        store.insert(&link("gone001", "https://a.com", -10)).await.unwrap();
        store.insert(&link("live001", "https://b.com", 60)).await.unwrap();

        let keys = store.load_live_keys(Utc::now()).await.unwrap();
        assert_eq!(keys.codes, vec!["live001".to_string()]);
        assert_eq!(keys.targets, vec!["https://b.com".to_string()]);

        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.delete("live001").await.unwrap());
        assert!(!store.delete("live001").await.unwrap());
    }
}
