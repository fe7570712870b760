//! Embedding service client.
//!
//! The external embedding API is an OpenAI-compatible `/v1/embeddings`
//! endpoint: texts in, fixed-dimension float vectors out. The model is
//! a black box; for a given model version the vectors are deterministic
//! per input text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SearchError, SearchResult};

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Vector width produced by the default model.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Anything that can turn text into vectors.
///
/// The pipeline and the recommender are written against this trait so a
/// different provider can be substituted without touching either.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per text, order preserved.
    async fn embed(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> SearchResult<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or(SearchError::CountMismatch {
            sent: 1,
            received: 0,
        })
    }

    /// Width of the vectors this embedder produces.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedding client.
    ///
    /// # Errors
    /// Returns an error if the API key is empty or the HTTP client
    /// cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> SearchResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SearchError::MissingCredentials("openai_api_key"));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("shelfmark/0.1.0 (https://github.com/oxur/shelfmark)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| SearchError::Http {
                source_name: "embeddings".to_string(),
                message: e.to_string(),
            })?;

        let body: EmbeddingsResponse =
            response.json().await.map_err(|e| SearchError::Parse {
                source_name: "embeddings".to_string(),
                message: e.to_string(),
            })?;

        if body.data.len() != texts.len() {
            return Err(SearchError::CountMismatch {
                sent: texts.len(),
                received: body.data.len(),
            });
        }

        // The API may return data out of order; restore input order.
        let mut data = body.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(base_url: &str) -> OpenAiEmbedder {
        OpenAiEmbedder::new(base_url, "test-key", DEFAULT_MODEL, 3).unwrap()
    }

    #[test]
    fn test_rejects_empty_api_key() {
        let result = OpenAiEmbedder::new("http://localhost", "  ", DEFAULT_MODEL, 3);
        assert!(matches!(
            result,
            Err(SearchError::MissingCredentials("openai_api_key"))
        ));
    }

    #[tokio::test]
    async fn test_embed_empty_batch_is_local() {
        let embedder = embedder("http://127.0.0.1:1");
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_parses_and_reorders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": DEFAULT_MODEL
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.4, 0.5, 0.6] },
                    { "index": 0, "embedding": [0.1, 0.2, 0.3] }
                ]
            })))
            .mount(&server)
            .await;

        let vectors = embedder(&server.uri())
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "index": 0, "embedding": [0.1] }]
            })))
            .mount(&server)
            .await;

        let result = embedder(&server.uri())
            .embed(&["a".to_string(), "b".to_string()])
            .await;
        assert!(matches!(
            result,
            Err(SearchError::CountMismatch {
                sent: 2,
                received: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_embed_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = embedder(&server.uri()).embed(&["a".to_string()]).await;
        assert!(matches!(result, Err(SearchError::Http { .. })));
    }

    #[tokio::test]
    async fn test_embed_query_uses_batch_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "index": 0, "embedding": [0.9, 0.8, 0.7] }]
            })))
            .mount(&server)
            .await;

        let vector = embedder(&server.uri())
            .embed_query("a story about forgiveness")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.9, 0.8, 0.7]);
    }
}
