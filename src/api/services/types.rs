//! API 请求/响应类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ShortLink;

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ShortenRequest {
    pub url: String,
    #[serde(default)]
    pub custom_code: Option<String>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShortenResponse {
    pub code: String,
    pub short_url: String,
    pub target: String,
    /// `None` for links created without a TTL
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShortenResponse {
    pub fn from_link(link: ShortLink, short_url: String) -> Self {
        let expires_at = (!link.never_expires()).then_some(link.expires_at);
        Self {
            code: link.code,
            short_url,
            target: link.target,
            expires_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub storage_backend: String,
    pub cache_backend: String,
    pub uptime_seconds: i64,
    pub stats_dropped: u64,
}
