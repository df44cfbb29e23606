use std::fmt;

#[derive(Debug, Clone)]
pub enum LinkgateError {
    InvalidInput(String),
    NotFound(String),
    Expired(String),
    AliasConflict(String),
    GenerationExhausted(String),
    StoreUnavailable(String),
    CacheUnavailable(String),
    Configuration(String),
    Serialization(String),
    FileOperation(String),
}

impl LinkgateError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkgateError::InvalidInput(_) => "E001",
            LinkgateError::NotFound(_) => "E002",
            LinkgateError::Expired(_) => "E003",
            LinkgateError::AliasConflict(_) => "E004",
            LinkgateError::GenerationExhausted(_) => "E005",
            LinkgateError::StoreUnavailable(_) => "E006",
            LinkgateError::CacheUnavailable(_) => "E007",
            LinkgateError::Configuration(_) => "E008",
            LinkgateError::Serialization(_) => "E009",
            LinkgateError::FileOperation(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkgateError::InvalidInput(_) => "Invalid Input",
            LinkgateError::NotFound(_) => "Resource Not Found",
            LinkgateError::Expired(_) => "Link Expired",
            LinkgateError::AliasConflict(_) => "Alias Conflict",
            LinkgateError::GenerationExhausted(_) => "Code Generation Exhausted",
            LinkgateError::StoreUnavailable(_) => "Store Unavailable",
            LinkgateError::CacheUnavailable(_) => "Cache Unavailable",
            LinkgateError::Configuration(_) => "Configuration Error",
            LinkgateError::Serialization(_) => "Serialization Error",
            LinkgateError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkgateError::InvalidInput(msg)
            | LinkgateError::NotFound(msg)
            | LinkgateError::Expired(msg)
            | LinkgateError::AliasConflict(msg)
            | LinkgateError::GenerationExhausted(msg)
            | LinkgateError::StoreUnavailable(msg)
            | LinkgateError::CacheUnavailable(msg)
            | LinkgateError::Configuration(msg)
            | LinkgateError::Serialization(msg)
            | LinkgateError::FileOperation(msg) => msg,
        }
    }

    /// HTTP status the boundary layer reports for this error.
    ///
    /// `Expired` is 410 on the JSON API; the redirect route renders every
    /// resolution failure as a plain 404 regardless.
    #[cfg(feature = "server")]
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            LinkgateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LinkgateError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkgateError::Expired(_) => StatusCode::GONE,
            LinkgateError::AliasConflict(_) => StatusCode::CONFLICT,
            LinkgateError::GenerationExhausted(_)
            | LinkgateError::StoreUnavailable(_)
            | LinkgateError::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LinkgateError::Configuration(_)
            | LinkgateError::Serialization(_)
            | LinkgateError::FileOperation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkgateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkgateError {}

// 便捷的构造函数
impl LinkgateError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        LinkgateError::InvalidInput(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkgateError::NotFound(msg.into())
    }

    pub fn expired<T: Into<String>>(msg: T) -> Self {
        LinkgateError::Expired(msg.into())
    }

    pub fn alias_conflict<T: Into<String>>(msg: T) -> Self {
        LinkgateError::AliasConflict(msg.into())
    }

    pub fn generation_exhausted<T: Into<String>>(msg: T) -> Self {
        LinkgateError::GenerationExhausted(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        LinkgateError::StoreUnavailable(msg.into())
    }

    pub fn cache_unavailable<T: Into<String>>(msg: T) -> Self {
        LinkgateError::CacheUnavailable(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        LinkgateError::Configuration(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkgateError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        LinkgateError::FileOperation(msg.into())
    }
}

impl From<sea_orm::DbErr> for LinkgateError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkgateError::StoreUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for LinkgateError {
    fn from(err: redis::RedisError) -> Self {
        LinkgateError::CacheUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for LinkgateError {
    fn from(err: std::io::Error) -> Self {
        LinkgateError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkgateError {
    fn from(err: serde_json::Error) -> Self {
        LinkgateError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkgateError>;
