use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::{StatRecorder, StatSink, TieredStatSink};
use crate::cache::{DistributedCache, create_distributed_cache};
use crate::config::StaticConfig;
use crate::services::{AppContext, LinkService, PipelineSettings};
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub app: AppContext,
    pub stat_sink: Arc<dyn StatSink>,
    pub stat_workers: Vec<JoinHandle<()>>,
    pub maintenance: Vec<JoinHandle<()>>,
}

/// Wire store, caches, filters and limiter into a `LinkService` without
/// starting any background task.
pub async fn build_link_service(config: &StaticConfig) -> Result<Arc<LinkService>> {
    let store = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", store.backend_name());

    let cache = create_distributed_cache(&config.cache.distributed)
        .await
        .context("Failed to create distributed cache")?;

    let recorder = StatRecorder::new(config.stats.queue_capacity, config.stats.batch_size);
    let links = LinkService::new(PipelineSettings::from(config), store, cache, recorder)
        .context("Failed to build existence filters")?;
    Ok(Arc::new(links))
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let links = build_link_service(config).await?;

    // 只加载存活链接的短码和目标到 Bloom Filter
    let warmed = links
        .warm_filters()
        .await
        .context("Failed to warm existence filters")?;
    if warmed > config.filter.expected_items {
        warn!(
            "{} live links exceed filter.expected_items ({}), false positive rate will be higher than configured",
            warmed, config.filter.expected_items
        );
    }

    let stat_sink: Arc<dyn StatSink> = Arc::new(TieredStatSink::new(
        links.distributed_cache().clone(),
        links.store().clone(),
    ));
    let stat_workers = links
        .stat_recorder()
        .spawn_workers(stat_sink.clone(), config.stats.workers);
    debug!("{} stat workers started", stat_workers.len());

    let app = AppContext::from_config(links, config);
    let maintenance = spawn_maintenance(&app, config);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        app,
        stat_sink,
        stat_workers,
        maintenance,
    })
}

fn interval_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// L1 sweep, limiter sweep, reaper and L2 idle-connection reap.
pub fn spawn_maintenance(app: &AppContext, config: &StaticConfig) -> Vec<JoinHandle<()>> {
    let mut handles = vec![
        app.links
            .local_cache()
            .spawn_sweeper(interval_secs(config.cache.local.sweep_interval_secs)),
        app.gate
            .spawn_sweeper(interval_secs(config.limiter.sweep_interval_secs)),
    ];

    if config.reaper.enabled {
        handles.push(spawn_reaper(
            app.links.clone(),
            interval_secs(config.reaper.interval_secs),
        ));
    } else {
        info!("Expired-link reaper is disabled");
    }

    let cache = app.links.distributed_cache().clone();
    if cache.backend_name() == "redis" {
        handles.push(spawn_idle_reaper(
            cache,
            interval_secs(config.cache.distributed.idle_timeout_secs),
        ));
    }

    handles
}

fn spawn_reaper(links: Arc<LinkService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match links.reap_expired().await {
                Ok(0) => debug!("Reaper: no expired links"),
                Ok(n) => info!("Reaper: removed {} expired links", n),
                Err(e) => warn!("Reaper run failed: {}", e),
            }
        }
    })
}

fn spawn_idle_reaper(cache: Arc<dyn DistributedCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let closed = cache.reap_idle().await;
            if closed > 0 {
                debug!("Closed {} idle distributed cache connections", closed);
            }
        }
    })
}
