use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analytics::{StatRecorder, StatSink};

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub async fn wait_for_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, flushing data..."),
        Err(e) => warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }
}

/// Stop background tasks, then flush whatever is still queued.
pub async fn perform_shutdown_tasks(
    recorder: &StatRecorder,
    sink: &Arc<dyn StatSink>,
    stat_workers: Vec<JoinHandle<()>>,
    maintenance: Vec<JoinHandle<()>>,
) {
    for handle in maintenance {
        handle.abort();
    }
    for handle in stat_workers {
        handle.abort();
        let _ = handle.await;
    }

    match timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        recorder.flush_pending(sink),
    )
    .await
    {
        Ok(0) => info!("No pending access stats on shutdown"),
        Ok(n) => info!("Flushed {} pending access events on shutdown", n),
        Err(_) => error!(
            "Stat flush timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }

    if recorder.dropped() > 0 {
        warn!(
            "{} access events were dropped because the stat queue was full",
            recorder.dropped()
        );
    }
}
