use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, error, trace};

use crate::errors::LinkgateError;
use crate::services::AppContext;

pub struct RedirectService;

impl RedirectService {
    /// `GET /{code}`; every resolution failure renders as 404.
    pub async fn handle_redirect(
        ctx: web::Data<AppContext>,
        path: web::Path<String>,
    ) -> impl Responder {
        let code = path.into_inner();

        match ctx.links.resolve(&code).await {
            Ok(resolution) => {
                trace!("Redirect {} -> {} ({:?})", code, resolution.target, resolution.tier);
                let status = if ctx.http.permanent_redirect {
                    StatusCode::MOVED_PERMANENTLY
                } else {
                    StatusCode::FOUND
                };
                HttpResponse::build(status)
                    .insert_header((header::LOCATION, resolution.target))
                    .finish()
            }
            Err(LinkgateError::StoreUnavailable(msg)) => {
                error!("Store error during redirect lookup for {}: {}", code, msg);
                Self::not_found_response()
            }
            Err(e) => {
                debug!("Redirect for {} not served: {}", code, e);
                Self::not_found_response()
            }
        }
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }
}
