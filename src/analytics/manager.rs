//! 访问统计队列
//!
//! - 有界队列，满时丢弃最新事件（drop-newest），只计数不阻塞
//! - 固定数量的 worker 共享一个接收端，按批聚合后写入 `StatSink`
//! - 写入失败只记录日志，不重试

use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::NaiveDate;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{StatEvent, StatSink};
use crate::storage::AccessDelta;

/// Fold a batch into one delta per `(code, UTC day)`.
///
/// `last_access_at` is the newest event of the group.
pub fn aggregate(events: Vec<StatEvent>) -> Vec<AccessDelta> {
    let mut grouped: HashMap<(String, NaiveDate), AccessDelta> = HashMap::new();

    for event in events {
        let day = event.at.date_naive();
        grouped
            .entry((event.code.clone(), day))
            .and_modify(|delta| {
                delta.count += 1;
                if event.at > delta.last_access_at {
                    delta.last_access_at = event.at;
                }
            })
            .or_insert(AccessDelta {
                code: event.code,
                count: 1,
                last_access_at: event.at,
            });
    }

    grouped.into_values().collect()
}

/// 访问统计记录器
///
/// Cloning is cheap; every clone feeds the same queue.
#[derive(Clone)]
pub struct StatRecorder {
    tx: mpsc::Sender<StatEvent>,
    rx: Arc<Mutex<mpsc::Receiver<StatEvent>>>,
    dropped: Arc<AtomicU64>,
    batch_size: usize,
}

impl StatRecorder {
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            dropped: Arc::new(AtomicU64::new(0)),
            batch_size: batch_size.max(1),
        }
    }

    /// 记录一次访问（非阻塞）
    pub fn record(&self, code: &str) {
        match self.tx.try_send(StatEvent::new(code)) {
            Ok(()) => trace!("StatRecorder: queued access for {}", code),
            Err(mpsc::error::TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    "StatRecorder: queue full, dropped access for {} (total dropped: {})",
                    event.code, dropped
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!("StatRecorder: queue closed, dropped access for {}", event.code);
            }
        }
    }

    /// Events rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events waiting in the queue.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// 启动 worker 池
    pub fn spawn_workers(&self, sink: Arc<dyn StatSink>, workers: usize) -> Vec<JoinHandle<()>> {
        (0..workers.max(1))
            .map(|id| {
                let recorder = self.clone();
                let sink = Arc::clone(&sink);
                tokio::spawn(async move { recorder.run_worker(id, sink).await })
            })
            .collect()
    }

    async fn run_worker(&self, id: usize, sink: Arc<dyn StatSink>) {
        debug!("StatRecorder: worker {} started", id);
        loop {
            let batch = {
                let mut rx = self.rx.lock().await;
                let Some(first) = rx.recv().await else {
                    break;
                };
                let mut batch = Vec::with_capacity(self.batch_size);
                batch.push(first);
                while batch.len() < self.batch_size {
                    match rx.try_recv() {
                        Ok(event) => batch.push(event),
                        Err(_) => break,
                    }
                }
                batch
            };

            Self::flush_batch(&sink, batch).await;
        }
        debug!("StatRecorder: worker {} stopped", id);
    }

    /// Drain whatever is queued right now and flush it. Returns the number of
    /// events taken off the queue.
    ///
    /// Idle workers park on the receiver lock, so stop them first.
    pub async fn flush_pending(&self, sink: &Arc<dyn StatSink>) -> usize {
        let batch = {
            let mut rx = self.rx.lock().await;
            let mut batch = Vec::new();
            while let Ok(event) = rx.try_recv() {
                batch.push(event);
            }
            batch
        };

        let taken = batch.len();
        if taken > 0 {
            Self::flush_batch(sink, batch).await;
        }
        taken
    }

    async fn flush_batch(sink: &Arc<dyn StatSink>, batch: Vec<StatEvent>) {
        let events = batch.len();
        let deltas = aggregate(batch);
        let codes = deltas.len();

        match sink.flush(deltas).await {
            Ok(()) => trace!(
                "StatRecorder: flushed {} events across {} codes",
                events, codes
            ),
            Err(e) => warn!(
                "StatRecorder: flush failed, {} events discarded: {}",
                events, e
            ),
        }
    }
}
