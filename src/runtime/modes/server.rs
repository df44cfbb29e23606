//! Server mode
//!
//! Builds the `AppContext`, starts background tasks and runs the actix
//! server until it stops or a shutdown signal arrives.

use std::time::Duration;

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::{AdmissionMiddleware, configure_routes};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let app_context = web::Data::new(startup.app.clone());

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} worker threads for the server", cpu_count);

    if config.server.trusted_proxies.is_empty() {
        warn!(
            "Admission limiting: auto-detect mode. \
             Connections from private IPs will use X-Forwarded-For. \
             Configure server.trusted_proxies to restrict this."
        );
    }

    let server = HttpServer::new(move || {
        App::new()
            .wrap(AdmissionMiddleware)
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(app_context.clone())
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .disable_signals()
        .run();
    let handle = server.handle();

    let recorder = startup.app.links.stat_recorder().clone();
    tokio::select! {
        res = server => {
            res.context("HTTP server error")?;
        }
        _ = lifetime::shutdown::wait_for_signal() => {
            handle.stop(true).await;
        }
    }

    lifetime::shutdown::perform_shutdown_tasks(
        &recorder,
        &startup.stat_sink,
        startup.stat_workers,
        startup.maintenance,
    )
    .await;
    warn!("Graceful shutdown: all tasks completed");

    Ok(())
}
