//! Error types for pagepilot
//!
//! None of these escape the public `Optimizer` operations: features catch
//! them per item, log in debug mode and move on. They exist so the internal
//! helpers can use `?` and so the CLI can report failures.

use thiserror::Error;

/// Main error type for page operations
#[derive(Debug, Error)]
pub enum PageError {
    /// A selector could not be parsed
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    /// A URL could not be resolved against the page
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The rules of a stylesheet cannot be read (cross-origin sheet)
    #[error("cannot access rules of stylesheet {0}")]
    StylesheetAccess(String),

    /// HTML parsing error
    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageError {
    /// Build an `InvalidUrl` error from the offending input
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

/// Convenience Result type for pagepilot operations
pub type Result<T> = std::result::Result<T, PageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PageError::InvalidSelector("a[".to_string());
        assert_eq!(err.to_string(), "invalid selector 'a['");

        let err = PageError::StylesheetAccess("https://cdn.example/x.css".to_string());
        assert!(err.to_string().contains("cdn.example"));
    }

    #[test]
    fn test_invalid_url_keeps_source() {
        let source = url::Url::parse("::nope").unwrap_err();
        let err = PageError::invalid_url("::nope", source);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PageError = io.into();
        assert!(matches!(err, PageError::Io(_)));
    }
}
