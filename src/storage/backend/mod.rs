//! SeaORM storage backend
//!
//! SQLite, MySQL/MariaDB and PostgreSQL through one `DatabaseConnection`.
//! Every statement goes through `retry::with_retry` so transient lock and
//! connection errors are retried with backoff before surfacing.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{LinkgateError, Result};
use crate::storage::{AccessDelta, DailyStat, LinkStore, LiveKeys, ShortLink};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_shortlink, shortlink_to_active_model};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(LinkgateError::configuration(format!(
            "Cannot infer database type from URL '{}'. Supported: sqlite://, *.db, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str, config: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(LinkgateError::configuration("database.database_url is empty"));
        }

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name, config).await?
        };

        let storage = Self::from_connection(db, backend_name, retry::RetryConfig::from(config));
        run_migrations(&storage.db).await?;

        info!("{} storage initialized", storage.backend_name.to_uppercase());
        Ok(storage)
    }

    /// Wrap an existing, already migrated connection.
    pub fn from_connection(
        db: DatabaseConnection,
        backend_name: &str,
        retry_config: retry::RetryConfig,
    ) -> Self {
        Self {
            db,
            backend_name: backend_name.to_string(),
            retry_config,
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LinkStore for SeaOrmStorage {
    async fn get(&self, code: &str) -> Result<Option<ShortLink>> {
        self.find_by_code(code).await
    }

    async fn find_live_by_target(
        &self,
        target: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortLink>> {
        self.find_live_target(target, now).await
    }

    async fn insert(&self, link: &ShortLink) -> Result<()> {
        self.insert_link(link).await
    }

    async fn delete(&self, code: &str) -> Result<bool> {
        self.delete_link(code).await
    }

    async fn record_access(&self, deltas: &[AccessDelta]) -> Result<()> {
        self.apply_access(deltas).await
    }

    async fn daily_stats(&self, code: &str, since: NaiveDate) -> Result<Vec<DailyStat>> {
        self.query_daily_stats(code, since).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.purge_expired(now).await
    }

    async fn load_live_keys(&self, now: DateTime<Utc>) -> Result<LiveKeys> {
        self.query_live_keys(now).await
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}
