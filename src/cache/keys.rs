//! L2 key namespaces

/// 缓存目标地址
pub fn url_key(code: &str) -> String {
    format!("url:{}", code)
}

/// 访问计数器
pub fn counter_key(code: &str) -> String {
    format!("counter:{}", code)
}
