//! Write operations for SeaOrmStorage

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use tracing::{debug, info};

use super::converters::shortlink_to_active_model;
use super::{SeaOrmStorage, retry};
use crate::errors::{LinkgateError, Result};
use crate::storage::{AccessDelta, ShortLink};

use migration::entities::{link_daily_stat, short_link};

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl SeaOrmStorage {
    /// Plain insert; the primary key arbitrates concurrent writers.
    pub(super) async fn insert_link(&self, link: &ShortLink) -> Result<()> {
        let db = &self.db;

        let result = retry::with_retry(
            &format!("insert({})", link.code),
            self.retry_config,
            || async {
                short_link::Entity::insert(shortlink_to_active_model(link))
                    .exec(db)
                    .await
                    .map(|_| ())
            },
        )
        .await;

        match result {
            Ok(()) => {
                debug!("Short link inserted: {}", link.code);
                Ok(())
            }
            Err(e) if retry::is_unique_violation(&e) => Err(LinkgateError::alias_conflict(
                format!("code '{}' is already bound", link.code),
            )),
            Err(e) => Err(LinkgateError::store_unavailable(format!(
                "插入短链接失败: {}",
                e
            ))),
        }
    }

    pub(super) async fn delete_link(&self, code: &str) -> Result<bool> {
        let db = &self.db;

        let result = retry::with_retry(&format!("delete({})", code), self.retry_config, || async {
            short_link::Entity::delete_by_id(code.to_string())
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkgateError::store_unavailable(format!("删除短链接失败: {}", e)))?;

        Ok(result.rows_affected > 0)
    }

    /// 批量写入访问计数
    ///
    /// One transaction per batch: bump `access_count`/`last_access_at` on the
    /// link row, then upsert the per-day bucket.
    pub(super) async fn apply_access(&self, deltas: &[AccessDelta]) -> Result<()> {
        if deltas.is_empty() {
            return Ok(());
        }

        let db = &self.db;
        let deltas_ref = &deltas;

        retry::with_retry("record_access", self.retry_config, || async move {
            let txn = db.begin().await?;

            for delta in deltas_ref.iter() {
                let updated = short_link::Entity::update_many()
                    .col_expr(
                        short_link::Column::AccessCount,
                        Expr::col((short_link::Entity, short_link::Column::AccessCount))
                            .add(clamp_i64(delta.count)),
                    )
                    .col_expr(
                        short_link::Column::LastAccessAt,
                        Expr::value(delta.last_access_at),
                    )
                    .filter(short_link::Column::ShortCode.eq(delta.code.as_str()))
                    .exec(&txn)
                    .await?;

                // 链接已删除或不存在时跳过日桶
                if updated.rows_affected == 0 {
                    continue;
                }

                let row = link_daily_stat::ActiveModel {
                    short_code: Set(delta.code.clone()),
                    day: Set(delta.last_access_at.date_naive()),
                    count: Set(clamp_i64(delta.count)),
                    ..Default::default()
                };
                link_daily_stat::Entity::insert(row)
                    .on_conflict(
                        OnConflict::columns([
                            link_daily_stat::Column::ShortCode,
                            link_daily_stat::Column::Day,
                        ])
                        .value(
                            link_daily_stat::Column::Count,
                            Expr::col((link_daily_stat::Entity, link_daily_stat::Column::Count))
                                .add(clamp_i64(delta.count)),
                        )
                        .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await?;
            }

            txn.commit().await
        })
        .await
        .map_err(|e| LinkgateError::store_unavailable(format!("写入访问统计失败: {}", e)))?;

        debug!(
            "Flushed access counts for {} codes",
            deltas.len()
        );
        Ok(())
    }

    pub(super) async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;

        let result = retry::with_retry("delete_expired", self.retry_config, || async {
            short_link::Entity::delete_many()
                .filter(short_link::Column::ExpiresAt.lt(now))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkgateError::store_unavailable(format!("清理过期链接失败: {}", e)))?;

        if result.rows_affected > 0 {
            info!("Reaped {} expired short links", result.rows_affected);
        }
        Ok(result.rows_affected)
    }
}
