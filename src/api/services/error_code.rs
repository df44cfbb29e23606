//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::LinkgateError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 准入错误
/// - 3000-3099: 链接错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,
    CacheUnavailable = 1031,

    // 准入错误 2000-2099
    RateLimitExceeded = 2004,

    // 链接错误 3000-3099
    LinkNotFound = 3000,
    LinkAlreadyExists = 3001,
    LinkInvalidUrl = 3002,
    LinkExpired = 3003,
    LinkGenerationExhausted = 3004,
}

impl From<&LinkgateError> for ErrorCode {
    fn from(err: &LinkgateError) -> Self {
        match err {
            LinkgateError::InvalidInput(_) => ErrorCode::BadRequest,
            LinkgateError::NotFound(_) => ErrorCode::LinkNotFound,
            LinkgateError::Expired(_) => ErrorCode::LinkExpired,
            LinkgateError::AliasConflict(_) => ErrorCode::LinkAlreadyExists,
            LinkgateError::GenerationExhausted(_) => ErrorCode::LinkGenerationExhausted,
            LinkgateError::StoreUnavailable(_) => ErrorCode::ServiceUnavailable,
            LinkgateError::CacheUnavailable(_) => ErrorCode::CacheUnavailable,
            LinkgateError::Configuration(_)
            | LinkgateError::Serialization(_)
            | LinkgateError::FileOperation(_) => ErrorCode::InternalServerError,
        }
    }
}
