//! Error types for arxiv-digest.
//!
//! Every fallible operation in the library returns `Result<T, DigestError>`.
//! The stage variants (`Config`, `Fetch`, `Summarize`, `Output`) decide how the
//! pipeline reacts; the remaining variants carry the underlying cause.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for arxiv-digest operations.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Missing or invalid configuration. Aborts before any network call.
    #[error("Config error: {0}")]
    Config(String),

    /// Keyword search failed. The pipeline skips the keyword.
    #[error("Fetch error for '{keyword}': {message}")]
    Fetch { keyword: String, message: String },

    /// Summary generation failed. The pipeline substitutes a placeholder.
    #[error("Summarize error for {id}: {message}")]
    Summarize { id: String, message: String },

    /// Page or export could not be written. Aborts the run.
    #[error("Output error at {}: {message}", path.display())]
    Output { path: PathBuf, message: String },

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api { code: u16, message: String },

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Malformed response body (Atom feed, LLM JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// PDF could not be read
    #[error("PDF error: {0}")]
    Pdf(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Page template failed to compile or render
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DigestError {
    /// Whether this error halts the whole run instead of a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DigestError::Config(_) | DigestError::Output { .. } | DigestError::Template(_)
        )
    }

    pub(crate) fn fetch(keyword: &str, cause: impl std::fmt::Display) -> Self {
        DigestError::Fetch {
            keyword: keyword.to_string(),
            message: cause.to_string(),
        }
    }

    pub(crate) fn summarize(id: &str, cause: impl std::fmt::Display) -> Self {
        DigestError::Summarize {
            id: id.to_string(),
            message: cause.to_string(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        DigestError::Output {
            path: path.into(),
            message: cause.to_string(),
        }
    }
}

/// Result type alias using `DigestError`
pub type Result<T> = std::result::Result<T, DigestError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| DigestError::Parse(msg.to_string()))
    }
}
