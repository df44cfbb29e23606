pub mod error_code;
pub mod health;
pub mod helpers;
pub mod links;
pub mod redirect;
pub mod types;

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;

use crate::api::middleware::admission::HEALTH_PATH;

pub use error_code::ErrorCode;
pub use health::HealthService;
pub use helpers::{error_from_linkgate, error_response, json_response, success_response};
pub use links::LinkApi;
pub use redirect::RedirectService;
pub use types::{ApiResponse, HealthResponse, ShortenRequest, ShortenResponse};

/// Request bodies are small JSON documents
const JSON_BODY_LIMIT: usize = 16 * 1024;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            let response =
                error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &err.to_string());
            InternalError::from_response(err, response).into()
        })
}

/// `/api` scope, health probe, then the catch-all redirect route.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .route("/shorten", web::post().to(LinkApi::shorten))
            .route("/stats/{code}", web::get().to(LinkApi::stats)),
    )
    .route(HEALTH_PATH, web::get().to(HealthService::health_check))
    .route("/{code}", web::get().to(RedirectService::handle_redirect))
    .route("/{code}", web::head().to(RedirectService::handle_redirect));
}
