//! 准入限流中间件
//!
//! Charges the global bucket for every request and the API bucket for the
//! resolution surface (`/api/*` and `/{code}`). The health probe is only
//! charged globally. Rejections short-circuit with 429.

use actix_service::{Service, Transform};
use actix_web::{
    Error, web,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::debug;

use crate::api::services::{ErrorCode, error_response};
use crate::services::AppContext;
use crate::utils::client_ip::client_identity;

/// Operational probe, charged against the global bucket only
pub const HEALTH_PATH: &str = "/health";

/// 除健康检查外，`/api/*` 与 `/{code}` 都消耗 API 桶
pub fn charges_api_bucket(path: &str) -> bool {
    path != HEALTH_PATH
}

/// Admission middleware factory
#[derive(Clone, Default)]
pub struct AdmissionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdmissionService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionService {
            service: Rc::new(service),
        }))
    }
}

pub struct AdmissionService<S> {
    service: Rc<S>,
}

fn admit(req: &ServiceRequest) -> bool {
    let Some(ctx) = req.app_data::<web::Data<AppContext>>() else {
        return true;
    };

    let peer = req.peer_addr().map(|addr| addr.ip().to_string());
    let identity = client_identity(peer.as_deref(), req.headers(), &ctx.http.trusted_proxies);
    let api_scope = charges_api_bucket(req.path());

    let admitted = ctx.gate.admit(&identity, api_scope);
    if !admitted {
        debug!("Admission denied for {} on {}", identity, req.path());
    }
    admitted
}

impl<S, B> Service<ServiceRequest> for AdmissionService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !admit(&req) {
            let response = error_response(
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimitExceeded,
                "Too many requests",
            );
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let srv = self.service.clone();
        Box::pin(async move { srv.call(req).await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_bucket_scope() {
        assert!(charges_api_bucket("/api/shorten"));
        assert!(charges_api_bucket("/api/stats/abc1234"));
        assert!(charges_api_bucket("/abc1234"));
        assert!(!charges_api_bucket(HEALTH_PATH));
    }
}
