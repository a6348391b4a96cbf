//! Error types for the collection and cleaning pipeline.

use std::path::PathBuf;

/// Result type alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the pipeline.
///
/// Validation that callers are expected to inspect (schema checks, range
/// masking) returns structured results instead of erroring; only hard stops
/// land here. Per-city collection failures are logged and skipped by
/// [`fetch_all`](crate::collector::AirQualityCollector::fetch_all) rather
/// than propagated.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing or invalid settings (credentials, malformed config file,
    /// unknown city or method name). Fatal, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Cleaning input is missing required structure. Fatal to that pipeline
    /// invocation; carries the validator's full error list.
    #[error("schema validation failed: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// Upstream API failure: network, HTTP status, payload shape, or call
    /// budget exhaustion. Transient causes are retried by the collector
    /// before this surfaces.
    #[error("API error: {message}")]
    Api {
        /// What went wrong, including retry context.
        message: String,
        /// The last underlying HTTP error, when there was one.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A requested stored batch does not exist.
    #[error("batch not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O error during storage operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error while reading or writing a batch.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP plumbing error outside the collector's retry classification
    /// (e.g. client construction).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an API error without an underlying cause.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            source: None,
        }
    }

    /// Create an API error wrapping the last HTTP failure.
    pub fn api_with(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Api {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a not-found error for a batch path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }
}
