//! Target URL validation
//!
//! Only absolute http(s) URLs with a host are accepted as redirect targets.

use url::Url;

use crate::errors::LinkgateError;

/// Upper bound on stored targets, matches common browser limits
pub const MAX_TARGET_LENGTH: usize = 8192;

#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    Empty,
    TooLong(usize),
    UnsupportedScheme(String),
    MissingHost,
    Malformed(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "URL cannot be empty"),
            Self::TooLong(len) => write!(
                f,
                "URL is {} bytes long, the limit is {}",
                len, MAX_TARGET_LENGTH
            ),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "Unsupported scheme '{}', only http and https are allowed",
                scheme
            ),
            Self::MissingHost => write!(f, "URL has no host"),
            Self::Malformed(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for LinkgateError {
    fn from(err: UrlValidationError) -> Self {
        LinkgateError::invalid_input(err.to_string())
    }
}

/// Validate a redirect target and return it trimmed.
///
/// The stored string is the caller's input (trimmed), not the normalized
/// `Url` serialization, so resolution returns exactly what was submitted.
pub fn validate_url(raw: &str) -> Result<&str, UrlValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }
    if trimmed.len() > MAX_TARGET_LENGTH {
        return Err(UrlValidationError::TooLong(trimmed.len()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => {
            UrlValidationError::UnsupportedScheme(String::new())
        }
        other => UrlValidationError::Malformed(other.to_string()),
    })?;

    // Url::parse 会把 scheme 统一为小写
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert_eq!(validate_url("https://example.com"), Ok("https://example.com"));
        assert!(validate_url("http://localhost:8080/a?b=c#d").is_ok());
        assert!(validate_url("HTTPS://EXAMPLE.com/Path").is_ok());
        assert_eq!(
            validate_url("  https://example.com/x  "),
            Ok("https://example.com/x")
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        for url in [
            "javascript:alert(1)",
            "data:text/html,<b>x</b>",
            "file:///etc/passwd",
            "ftp://example.com",
            "mailto:someone@example.com",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlValidationError::UnsupportedScheme(_))),
                "{} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_rejects_relative_and_empty() {
        assert_eq!(validate_url(""), Err(UrlValidationError::Empty));
        assert_eq!(validate_url("   "), Err(UrlValidationError::Empty));
        assert!(validate_url("example.com/path").is_err());
        assert!(validate_url("http://").is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_TARGET_LENGTH));
        assert!(matches!(
            validate_url(&long),
            Err(UrlValidationError::TooLong(_))
        ));
    }

    #[test]
    fn test_converts_to_invalid_input() {
        let err: LinkgateError = UrlValidationError::MissingHost.into();
        assert!(matches!(err, LinkgateError::InvalidInput(_)));
    }
}
