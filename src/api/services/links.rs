//! 短链接 API：创建与统计

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, error};

use crate::errors::LinkgateError;
use crate::services::{AppContext, CreateRequest};
use crate::utils::validate_url;

use super::error_code::ErrorCode;
use super::helpers::{error_from_linkgate, error_response, json_response, success_response};
use super::types::{ShortenRequest, ShortenResponse};

pub struct LinkApi;

impl LinkApi {
    /// `POST /api/shorten`
    pub async fn shorten(
        ctx: web::Data<AppContext>,
        body: web::Json<ShortenRequest>,
    ) -> impl Responder {
        let body = body.into_inner();
        let invalid_url = validate_url(&body.url).is_err();

        let req = CreateRequest {
            target: body.url,
            custom_code: body.custom_code,
            ttl_seconds: body.ttl_seconds,
        };

        match ctx.links.create(req).await {
            Ok(outcome) => {
                let (status, message) = if outcome.created {
                    (StatusCode::CREATED, "Created")
                } else {
                    (StatusCode::OK, "OK")
                };
                let short_url = ctx.http.short_url(&outcome.link.code);
                json_response(
                    status,
                    ErrorCode::Success,
                    message,
                    Some(ShortenResponse::from_link(outcome.link, short_url)),
                )
            }
            Err(e @ LinkgateError::InvalidInput(_)) if invalid_url => {
                debug!("Rejected target URL: {}", e);
                error_response(StatusCode::BAD_REQUEST, ErrorCode::LinkInvalidUrl, e.message())
            }
            Err(e) => Self::failure(&e),
        }
    }

    /// `GET /api/stats/{code}`
    pub async fn stats(ctx: web::Data<AppContext>, path: web::Path<String>) -> impl Responder {
        let code = path.into_inner();
        match ctx.links.stats(&code).await {
            Ok(stats) => success_response(stats),
            Err(e) => Self::failure(&e),
        }
    }

    fn failure(err: &LinkgateError) -> HttpResponse {
        if err.http_status().is_server_error() {
            error!("API request failed: {}", err);
        } else {
            debug!("API request rejected: {}", err);
        }
        error_from_linkgate(err)
    }
}
