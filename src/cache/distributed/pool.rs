//! Small multiplexed-connection pool for the Redis adapter.
//!
//! Each slot holds at most one `MultiplexedConnection`, created lazily and
//! replaced once it outlives `max_lifetime`. Slots are handed out round-robin;
//! a multiplexed connection pipelines concurrent requests, so the slot count
//! bounds sockets rather than in-flight commands.

use redis::aio::MultiplexedConnection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub size: usize,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: 16,
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
            connect_timeout: Duration::from_secs(2),
            response_timeout: Duration::from_secs(1),
        }
    }
}

struct PooledConnection {
    conn: MultiplexedConnection,
    created_at: Instant,
    last_used: parking_lot::Mutex<Instant>,
}

impl PooledConnection {
    fn usable(&self, max_lifetime: Duration) -> bool {
        self.created_at.elapsed() < max_lifetime
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }
}

pub struct RedisPool {
    client: redis::Client,
    slots: Vec<RwLock<Option<PooledConnection>>>,
    next: AtomicUsize,
    settings: PoolSettings,
}

/// Handle to a pooled connection; pass `slot` back to `invalidate` on error.
pub struct Checkout {
    pub conn: MultiplexedConnection,
    pub slot: usize,
}

impl RedisPool {
    pub fn new(client: redis::Client, settings: PoolSettings) -> Self {
        let size = settings.size.max(1);
        Self {
            client,
            slots: (0..size).map(|_| RwLock::new(None)).collect(),
            next: AtomicUsize::new(0),
            settings,
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Connections currently open.
    pub async fn open_connections(&self) -> usize {
        let mut open = 0;
        for slot in &self.slots {
            if slot.read().await.is_some() {
                open += 1;
            }
        }
        open
    }

    pub async fn get(&self) -> Result<Checkout, redis::RedisError> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let max_lifetime = self.settings.max_lifetime;

        {
            let guard = self.slots[slot].read().await;
            if let Some(ref pooled) = *guard
                && pooled.usable(max_lifetime)
            {
                pooled.touch();
                return Ok(Checkout {
                    conn: pooled.conn.clone(),
                    slot,
                });
            }
        }

        let mut guard = self.slots[slot].write().await;

        // 双重检查，避免竞态条件
        if let Some(ref pooled) = *guard
            && pooled.usable(max_lifetime)
        {
            pooled.touch();
            return Ok(Checkout {
                conn: pooled.conn.clone(),
                slot,
            });
        }

        let config = redis::AsyncConnectionConfig::new()
            .set_connection_timeout(Some(self.settings.connect_timeout))
            .set_response_timeout(Some(self.settings.response_timeout));
        let conn = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;
        let now = Instant::now();
        *guard = Some(PooledConnection {
            conn: conn.clone(),
            created_at: now,
            last_used: parking_lot::Mutex::new(now),
        });
        debug!("Redis connection established in slot {}", slot);

        Ok(Checkout { conn, slot })
    }

    /// 连接出错时丢弃，下次使用时重建
    pub async fn invalidate(&self, slot: usize) {
        if let Some(lock) = self.slots.get(slot) {
            *lock.write().await = None;
            debug!("Redis connection in slot {} reset due to error", slot);
        }
    }

    /// Close connections idle past `idle_timeout` or older than `max_lifetime`.
    pub async fn reap_idle(&self) -> usize {
        let mut closed = 0;
        for lock in &self.slots {
            let mut guard = lock.write().await;
            let expired = guard.as_ref().is_some_and(|pooled| {
                pooled.last_used.lock().elapsed() >= self.settings.idle_timeout
                    || !pooled.usable(self.settings.max_lifetime)
            });
            if expired {
                *guard = None;
                closed += 1;
            }
        }
        closed
    }
}
