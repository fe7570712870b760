//! Error types for the ETL pipeline.

use thiserror::Error;

/// Errors that can occur in the pipeline stages.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An HTTP request to an external model service failed.
    #[error("HTTP error from {source_name}: {message}")]
    Http {
        source_name: String,
        message: String,
    },

    /// The external service returned a rate-limit response.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// A response from an external service could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// A required credential is missing from the configuration.
    #[error("missing credential: {0}")]
    MissingCredentials(&'static str),

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error reading the source dataset.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An error propagated from the core domain layer.
    #[error("database error: {0}")]
    Database(#[from] shelfmark_core::Error),

    /// An error propagated from the search layer.
    #[error("search error: {0}")]
    Search(#[from] shelfmark_search::SearchError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Returns `true` when the error is transient and the operation may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::RateLimited { .. })
    }
}

/// Convenience alias for pipeline results.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
