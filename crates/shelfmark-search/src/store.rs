//! Vector database client.
//!
//! Speaks the Qdrant REST API: collection creation, point upsert, and
//! nearest-neighbor search. Points are keyed by the book's ISBN-13, so
//! re-indexing a book overwrites its prior vector (the store's own key
//! semantics; no extra dedup logic).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use shelfmark_core::model::Isbn13;

use crate::error::{SearchError, SearchResult};

/// One vector plus metadata, ready for upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub isbn13: Isbn13,
    pub vector: Vec<f32>,

    /// The text the vector was computed from (the tagged description).
    pub source_text: String,

    /// Copy of key catalog fields, stored as the point payload.
    pub title: String,
    pub authors: Option<String>,
    pub simple_category: Option<String>,
}

/// A ranked search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredHit {
    pub isbn13: Isbn13,
    pub score: f32,
}

/// Nearest-neighbor storage for book vectors.
///
/// The similarity metric is whatever the backing store was created
/// with (cosine for the Qdrant client here).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self, dimension: usize) -> SearchResult<()>;

    /// Upsert a batch of entries, keyed by ISBN-13.
    async fn upsert(&self, entries: &[EmbeddingEntry]) -> SearchResult<()>;

    /// Top-`limit` hits for a query vector, best first.
    async fn search(&self, vector: &[f32], limit: usize) -> SearchResult<Vec<ScoredHit>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchResultPoint>,
}

#[derive(Debug, Deserialize)]
struct SearchResultPoint {
    id: u64,
    score: f32,
}

/// Client for a Qdrant-compatible vector database.
#[derive(Debug, Clone)]
pub struct QdrantStore {
    http: Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    /// Create a new vector-store client for one collection.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> SearchResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("shelfmark/0.1.0 (https://github.com/oxur/shelfmark)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn http_error(e: reqwest::Error) -> SearchError {
        SearchError::Http {
            source_name: "vector-store".to_string(),
            message: e.to_string(),
        }
    }

    fn parse_error(e: reqwest::Error) -> SearchError {
        SearchError::Parse {
            source_name: "vector-store".to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> SearchResult<()> {
        let exists = self
            .http
            .get(self.collection_url())
            .send()
            .await?
            .status()
            .is_success();
        if exists {
            return Ok(());
        }

        log::info!(
            "Creating collection {} (dimension {dimension}, cosine)",
            self.collection
        );
        self.http
            .put(self.collection_url())
            .json(&json!({
                "vectors": { "size": dimension, "distance": "Cosine" }
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(Self::http_error)?;
        Ok(())
    }

    async fn upsert(&self, entries: &[EmbeddingEntry]) -> SearchResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.isbn13.as_u64(),
                    "vector": entry.vector,
                    "payload": {
                        "isbn13": entry.isbn13.as_u64(),
                        "title": entry.title,
                        "authors": entry.authors,
                        "simple_category": entry.simple_category,
                        "source_text": entry.source_text,
                    }
                })
            })
            .collect();

        self.http
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?
            .error_for_status()
            .map_err(Self::http_error)?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> SearchResult<Vec<ScoredHit>> {
        let response = self
            .http
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": false,
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(Self::http_error)?;

        let body: SearchResponse = response.json().await.map_err(Self::parse_error)?;

        Ok(body
            .result
            .into_iter()
            .map(|point| ScoredHit {
                isbn13: Isbn13::from_raw(point.id),
                score: point.score,
            })
            .collect())
    }
}
