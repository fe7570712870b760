//! Genre classification for catalog books.
//!
//! Two tiers: a local raw-to-simple category mapping handles the bulk
//! of the dataset for free, and a hosted zero-shot model covers books
//! whose raw category has no mapping. Books with no usable description
//! and no mapped category are recorded as `unknown` so reruns skip
//! them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use shelfmark_core::model::{Classification, Isbn13};
use shelfmark_core::schema::Database;
use shelfmark_core::taxonomy::{CategoryMap, CANDIDATE_LABELS};
use treadle::{Stage, StageContext, StageOutcome};

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::resilience::RateLimiter;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Model name recorded when a classification came from the local map.
pub const CATEGORY_MAP_MODEL: &str = "category-map";

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

/// Client for a hosted zero-shot classification endpoint.
#[derive(Debug, Clone)]
pub struct ZeroShotClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
    rate_limiter: RateLimiter,
}

impl ZeroShotClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: Option<String>,
        requests_per_second: u32,
    ) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_token,
            rate_limiter: RateLimiter::new(requests_per_second),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Classify `text` against the candidate labels, returning the
    /// best label and its confidence.
    pub async fn classify(&self, text: &str, labels: &[&str]) -> ServiceResult<(String, f64)> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/models/{}", self.base_url, self.model);
        let body = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
            },
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited {
                source_name: "huggingface".to_string(),
            });
        }
        let response = response.error_for_status().map_err(|e| ServiceError::Http {
            source_name: "huggingface".to_string(),
            message: e.to_string(),
        })?;

        let parsed: ZeroShotResponse =
            response.json().await.map_err(|e| ServiceError::Parse {
                source_name: "huggingface".to_string(),
                message: e.to_string(),
            })?;

        // Labels arrive sorted by descending score; the head is the
        // prediction.
        match (parsed.labels.first(), parsed.scores.first()) {
            (Some(label), Some(score)) => Ok((label.clone(), *score)),
            _ => Err(ServiceError::Parse {
                source_name: "huggingface".to_string(),
                message: "empty label or score list".to_string(),
            }),
        }
    }
}

/// Counters reported after a classify run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifySummary {
    /// Books resolved from the local category map.
    pub from_map: usize,
    /// Books classified by the hosted model.
    pub predicted: usize,
    /// Books recorded as `unknown` (no map entry and no description).
    pub unknown: usize,
    /// Books skipped because the model call failed.
    pub skipped: usize,
}

/// The Classify stage: assign a simple category to every book.
#[derive(Debug)]
pub struct ClassifyStage {
    client: ZeroShotClient,
    category_map: CategoryMap,
    db_path: PathBuf,
}

impl ClassifyStage {
    pub fn from_config(config: &Config, db_path: PathBuf) -> ServiceResult<Self> {
        let client = ZeroShotClient::new(
            &config.hf_base_url,
            &config.zero_shot_model,
            config.hf_api_token.clone(),
            config.hf_requests_per_second,
        )?;
        let category_map = match &config.category_map_path {
            Some(path) => CategoryMap::load(path)?,
            None => CategoryMap::default(),
        };
        Ok(Self::new(client, category_map, db_path))
    }

    #[must_use]
    pub fn new(client: ZeroShotClient, category_map: CategoryMap, db_path: PathBuf) -> Self {
        Self {
            client,
            category_map,
            db_path,
        }
    }

    /// Classify every book that does not yet have a classification.
    pub async fn run(&self) -> ServiceResult<ClassifySummary> {
        // Read phase: collect pending work, then drop the connection
        // before any awaits.
        let pending: Vec<(Isbn13, Option<String>, Option<String>)> = {
            let db = Database::open(&self.db_path)?;
            db.list_unclassified_books()?
                .into_iter()
                .map(|b| (b.isbn13, b.raw_category, b.description))
                .collect()
        };

        let mut summary = ClassifySummary::default();
        let mut results: Vec<Classification> = Vec::with_capacity(pending.len());

        for (isbn13, raw_category, description) in pending {
            if let Some(simple) = raw_category
                .as_deref()
                .and_then(|raw| self.category_map.simple_category(raw))
            {
                results.push(
                    Classification::new(isbn13, simple, 1.0).with_model(CATEGORY_MAP_MODEL),
                );
                summary.from_map += 1;
                continue;
            }

            let Some(text) = description.filter(|d| !d.trim().is_empty()) else {
                results.push(Classification::unknown(isbn13));
                summary.unknown += 1;
                continue;
            };

            match self.client.classify(&text, CANDIDATE_LABELS).await {
                Ok((label, confidence)) => {
                    results.push(
                        Classification::new(isbn13, label, confidence)
                            .with_model(self.client.model()),
                    );
                    summary.predicted += 1;
                }
                Err(e) => {
                    log::warn!("Classification failed for {isbn13}: {e}");
                    summary.skipped += 1;
                }
            }
        }

        let db = Database::open(&self.db_path)?;
        for classification in &results {
            db.apply_classification(classification)?;
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Stage for ClassifyStage {
    fn name(&self) -> &str {
        "classify"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.run().await {
            Ok(summary) => {
                log::info!(
                    "Classify complete: {} from map, {} predicted, {} unknown, {} skipped",
                    summary.from_map,
                    summary.predicted,
                    summary.unknown,
                    summary.skipped
                );
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Classify failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_core::model::BookRecord;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ZeroShotClient {
        ZeroShotClient::new(&server.uri(), "test-model", None, 100).unwrap()
    }

    fn seed_book(
        db_path: &std::path::Path,
        isbn: u64,
        raw_category: Option<&str>,
        description: Option<&str>,
    ) {
        let db = Database::open(db_path).unwrap();
        let mut book = BookRecord::new(Isbn13::from_raw(isbn), format!("Book {isbn}"));
        book.raw_category = raw_category.map(String::from);
        book.description = description.map(String::from);
        book.derive_columns(2026);
        db.upsert_book(&book).unwrap();
    }

    #[tokio::test]
    async fn test_classify_parses_top_label() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["Fiction", "Nonfiction"],
                "scores": [0.91, 0.09],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (label, score) = client
            .classify("a sweeping family saga", CANDIDATE_LABELS)
            .await
            .unwrap();
        assert_eq!(label, "Fiction");
        assert!((score - 0.91).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_classify_maps_429_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.classify("text", CANDIDATE_LABELS).await.unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_stage_uses_map_before_model() {
        let server = MockServer::start().await;
        // No mock mounted: a model call would fail the run counters.
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(&db_path, 9_780_000_000_001, Some("Juvenile Fiction"), None);

        let stage = ClassifyStage::new(client_for(&server), CategoryMap::default(), db_path.clone());
        let summary = stage.run().await.unwrap();

        assert_eq!(summary.from_map, 1);
        assert_eq!(summary.predicted, 0);

        let db = Database::open(&db_path).unwrap();
        let classification = db
            .get_classification(Isbn13::from_raw(9_780_000_000_001))
            .unwrap()
            .unwrap();
        assert_eq!(classification.label, "Children's Fiction");
        assert_eq!(classification.model, CATEGORY_MAP_MODEL);
        assert!((classification.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stage_falls_back_to_model_and_projects_category() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["Nonfiction", "Fiction"],
                "scores": [0.77, 0.23],
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(
            &db_path,
            9_780_000_000_002,
            Some("Obscure Shelf Label"),
            Some("an account of real events"),
        );

        let stage = ClassifyStage::new(client_for(&server), CategoryMap::default(), db_path.clone());
        let summary = stage.run().await.unwrap();
        assert_eq!(summary.predicted, 1);

        let db = Database::open(&db_path).unwrap();
        let book = db
            .get_book(Isbn13::from_raw(9_780_000_000_002))
            .unwrap()
            .unwrap();
        assert_eq!(book.simple_category.as_deref(), Some("Nonfiction"));
    }

    #[tokio::test]
    async fn test_stage_records_unknown_without_description() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(&db_path, 9_780_000_000_003, Some("Obscure Shelf Label"), None);

        let stage = ClassifyStage::new(client_for(&server), CategoryMap::default(), db_path.clone());
        let summary = stage.run().await.unwrap();
        assert_eq!(summary.unknown, 1);

        let db = Database::open(&db_path).unwrap();
        let classification = db
            .get_classification(Isbn13::from_raw(9_780_000_000_003))
            .unwrap()
            .unwrap();
        assert_eq!(classification.label, shelfmark_core::model::UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn test_stage_skips_failed_rows_and_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(
            &db_path,
            9_780_000_000_004,
            None,
            Some("needs the model, which is down"),
        );
        seed_book(&db_path, 9_780_000_000_005, Some("Fiction"), None);

        let stage = ClassifyStage::new(client_for(&server), CategoryMap::default(), db_path.clone());
        let summary = stage.run().await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.from_map, 1);
    }
}
