//! Error types for BrandLens.
//!
//! Library crates use [`BrandLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all BrandLens operations.
#[derive(Debug, thiserror::Error)]
pub enum BrandLensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during scraping or search.
    #[error("network error: {0}")]
    Network(String),

    /// A language-model provider call failed (API error, bad payload).
    #[error("provider error: {0}")]
    Provider(String),

    /// Query generation produced unusable output for one category.
    ///
    /// Fatal for that category's quota only; the run continues.
    #[error("query generation failed for category '{category}': {message}")]
    QueryGeneration { category: String, message: String },

    /// Structured output did not match the expected shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Persisted report artifact error (write, or invalid at read time).
    #[error("report error: {0}")]
    Report(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty brand, too few queries, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BrandLensError>;

impl BrandLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a query-generation error scoped to one category.
    pub fn generation(category: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::QueryGeneration {
            category: category.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BrandLensError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = BrandLensError::validation("num_queries must be at least 10");
        assert!(err.to_string().contains("at least 10"));
    }

    #[test]
    fn generation_error_names_category() {
        let err = BrandLensError::generation("budget", "output is not a JSON array");
        assert!(err.to_string().contains("'budget'"));
        assert!(err.to_string().contains("JSON array"));
    }
}
