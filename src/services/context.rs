//! Shared application state
//!
//! Built once at startup and handed to actix as `web::Data<AppContext>`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{ServerConfig, StaticConfig};
use crate::services::{AdmissionGate, LinkService};
use crate::utils::client_ip::TrustedProxies;

/// Boundary-layer settings the handlers need on every request.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub public_base_url: String,
    pub permanent_redirect: bool,
    pub trusted_proxies: TrustedProxies,
}

impl HttpSettings {
    pub fn from_config(server: &ServerConfig) -> Self {
        let base = if server.public_base_url.is_empty() {
            format!("http://{}:{}", server.host, server.port)
        } else {
            server.public_base_url.clone()
        };
        Self {
            public_base_url: base.trim_end_matches('/').to_string(),
            permanent_redirect: server.permanent_redirect,
            trusted_proxies: TrustedProxies::new(&server.trusted_proxies),
        }
    }

    /// `<public_base_url>/<code>`
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.public_base_url, code)
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub links: Arc<LinkService>,
    pub gate: Arc<AdmissionGate>,
    pub http: Arc<HttpSettings>,
    pub started_at: DateTime<Utc>,
}

impl AppContext {
    pub fn new(links: Arc<LinkService>, gate: Arc<AdmissionGate>, http: HttpSettings) -> Self {
        Self {
            links,
            gate,
            http: Arc::new(http),
            started_at: Utc::now(),
        }
    }

    /// Context wired from `config` around an existing service.
    pub fn from_config(links: Arc<LinkService>, config: &StaticConfig) -> Self {
        Self::new(
            links,
            Arc::new(AdmissionGate::from_config(&config.limiter)),
            HttpSettings::from_config(&config.server),
        )
    }
}
