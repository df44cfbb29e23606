//! HTTP boundary
//!
//! Thin actix handlers over `LinkService`; admission runs as middleware in
//! front of every route.

pub mod middleware;
pub mod services;

pub use middleware::AdmissionMiddleware;
pub use services::configure_routes;
