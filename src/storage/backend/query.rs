//! Read-only queries for SeaOrmStorage

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::{debug, error, info};

use super::converters::model_to_shortlink;
use super::{SeaOrmStorage, retry};
use crate::errors::{LinkgateError, Result};
use crate::storage::{DailyStat, LiveKeys, ShortLink};

use migration::entities::{link_daily_stat, short_link};

impl SeaOrmStorage {
    pub(super) async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        let db = &self.db;

        let model = retry::with_retry(&format!("get({})", code), self.retry_config, || async {
            short_link::Entity::find_by_id(code.to_string()).one(db).await
        })
        .await
        .map_err(|e| {
            error!("查询短链接失败（重试后仍失败）: {}", e);
            LinkgateError::store_unavailable(format!("failed to load '{}': {}", code, e))
        })?;

        Ok(model.map(model_to_shortlink))
    }

    pub(super) async fn find_live_target(
        &self,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortLink>> {
        let db = &self.db;

        let model = retry::with_retry("find_live_by_target", self.retry_config, || async {
            short_link::Entity::find()
                .filter(short_link::Column::TargetUrl.eq(target))
                .filter(short_link::Column::ExpiresAt.gt(now))
                .order_by_desc(short_link::Column::CreatedAt)
                .one(db)
                .await
        })
        .await
        .map_err(|e| LinkgateError::store_unavailable(format!("target lookup failed: {}", e)))?;

        Ok(model.map(model_to_shortlink))
    }

    pub(super) async fn query_daily_stats(
        &self,
        code: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailyStat>> {
        let db = &self.db;

        let rows = retry::with_retry(
            &format!("daily_stats({})", code),
            self.retry_config,
            || async {
                link_daily_stat::Entity::find()
                    .filter(link_daily_stat::Column::ShortCode.eq(code))
                    .filter(link_daily_stat::Column::Day.gte(since))
                    .order_by_asc(link_daily_stat::Column::Day)
                    .all(db)
                    .await
            },
        )
        .await
        .map_err(|e| LinkgateError::store_unavailable(format!("daily stats query failed: {}", e)))?;

        debug!("Loaded {} daily buckets for {}", rows.len(), code);
        Ok(rows
            .into_iter()
            .map(|row| DailyStat {
                date: row.day,
                count: row.count.max(0) as u64,
            })
            .collect())
    }

    /// 只加载短码和目标（用于 Bloom Filter 初始化，内存占用小）
    pub(super) async fn query_live_keys(&self, now: DateTime<Utc>) -> Result<LiveKeys> {
        let db = &self.db;

        let pairs: Vec<(String, String)> =
            retry::with_retry("load_live_keys", self.retry_config, || async {
                short_link::Entity::find()
                    .select_only()
                    .column(short_link::Column::ShortCode)
                    .column(short_link::Column::TargetUrl)
                    .filter(short_link::Column::ExpiresAt.gt(now))
                    .into_tuple::<(String, String)>()
                    .all(db)
                    .await
            })
            .await
            .map_err(|e| {
                LinkgateError::store_unavailable(format!("failed to load live keys: {}", e))
            })?;

        info!("Loaded {} live short codes", pairs.len());
        let (codes, targets) = pairs.into_iter().unzip();
        Ok(LiveKeys { codes, targets })
    }
}
