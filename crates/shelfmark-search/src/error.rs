//! Error types for the embedding and vector-store clients.

use thiserror::Error;

/// Errors from the search layer's external collaborators.
#[derive(Debug, Error)]
pub enum SearchError {
    /// An HTTP request to an external service failed.
    #[error("HTTP error from {source_name}: {message}")]
    Http {
        source_name: String,
        message: String,
    },

    /// A response from an external service could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The service returned fewer (or more) vectors than texts sent.
    #[error("embedding count mismatch: sent {sent}, received {received}")]
    CountMismatch { sent: usize, received: usize },

    /// A required credential is missing from the configuration.
    #[error("missing credential: {0}")]
    MissingCredentials(&'static str),

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error propagated from the core domain layer.
    #[error("database error: {0}")]
    Database(#[from] shelfmark_core::Error),
}

/// Convenience alias for search results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
