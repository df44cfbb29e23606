use actix_web::{Responder, web};
use chrono::Utc;
use tracing::trace;

use crate::services::AppContext;

use super::helpers::success_response;
use super::types::HealthResponse;

pub struct HealthService;

impl HealthService {
    /// `GET /health`; reports wiring only, no store round trip.
    pub async fn health_check(ctx: web::Data<AppContext>) -> impl Responder {
        trace!("Received health check request");

        success_response(HealthResponse {
            status: "healthy".to_string(),
            storage_backend: ctx.links.store().backend_name().to_string(),
            cache_backend: ctx.links.distributed_cache().backend_name().to_string(),
            uptime_seconds: (Utc::now() - ctx.started_at).num_seconds().max(0),
            stats_dropped: ctx.links.stat_recorder().dropped(),
        })
    }
}
