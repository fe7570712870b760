//! Vector search for shelfmark.
//!
//! Wraps the external embedding service and the external vector
//! database behind the [`Embedder`] and [`VectorStore`] traits, and
//! joins nearest-neighbor hits back to catalog rows in the
//! [`Recommender`].

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod embedding;
pub mod error;
pub mod recommend;
pub mod store;

pub use embedding::{Embedder, OpenAiEmbedder};
pub use error::{SearchError, SearchResult};
pub use recommend::{Recommendation, RecommendOptions, Recommender};
pub use store::{EmbeddingEntry, QdrantStore, ScoredHit, VectorStore};
