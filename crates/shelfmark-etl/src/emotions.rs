//! Emotional tone scoring for book descriptions.
//!
//! Descriptions are split into sentences and each sentence is scored
//! by a hosted emotion classifier. A book's profile keeps, for every
//! emotion, the highest score any of its sentences reached. A single
//! vivid sentence is a better tone signal than a blurb-wide average.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use shelfmark_core::model::{Emotion, EmotionProfile, Isbn13};
use shelfmark_core::schema::Database;
use treadle::{Stage, StageContext, StageOutcome};

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::resilience::RateLimiter;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct EmotionRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Client for a hosted sentence-level emotion classifier.
#[derive(Debug, Clone)]
pub struct EmotionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
    rate_limiter: RateLimiter,
}

impl EmotionClient {
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

    /// Score a batch of sentences. Returns one score list per input
    /// sentence, in input order. Labels the model emits that are not
    /// part of the emotion taxonomy are ignored.
    pub async fn score_sentences(
        &self,
        sentences: &[String],
    ) -> ServiceResult<Vec<Vec<(Emotion, f64)>>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        self.rate_limiter.acquire().await;

        let url = format!("{}/models/{}", self.base_url, self.model);
        let mut request = self
            .http
            .post(&url)
            .json(&EmotionRequest { inputs: sentences });
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

        let parsed: Vec<Vec<LabelScore>> =
            response.json().await.map_err(|e| ServiceError::Parse {
                source_name: "huggingface".to_string(),
                message: e.to_string(),
            })?;

        if parsed.len() != sentences.len() {
            return Err(ServiceError::Parse {
                source_name: "huggingface".to_string(),
                message: format!(
                    "expected {} score lists, got {}",
                    sentences.len(),
                    parsed.len()
                ),
            });
        }

        Ok(parsed
            .into_iter()
            .map(|scores| {
                scores
                    .into_iter()
                    .filter_map(|ls| Emotion::from_label(&ls.label).map(|e| (e, ls.score)))
                    .collect()
            })
            .collect())
    }
}

/// Split a description into sentences on terminal punctuation. Runs of
/// punctuation produce empty fragments, which are dropped.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Counters reported after an emotions run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmotionSummary {
    /// Books that received a full emotion profile.
    pub scored: usize,
    /// Books skipped because the model call failed.
    pub skipped: usize,
}

/// The Emotions stage: build an emotion profile for every eligible book.
#[derive(Debug)]
pub struct EmotionStage {
    client: EmotionClient,
    db_path: PathBuf,
}

impl EmotionStage {
    pub fn from_config(config: &Config, db_path: PathBuf) -> ServiceResult<Self> {
        let client = EmotionClient::new(
            &config.hf_base_url,
            &config.emotion_model,
            config.hf_api_token.clone(),
            config.hf_requests_per_second,
        )?;
        Ok(Self::new(client, db_path))
    }

    #[must_use]
    pub fn new(client: EmotionClient, db_path: PathBuf) -> Self {
        Self { client, db_path }
    }

    pub async fn run(&self) -> ServiceResult<EmotionSummary> {
        let pending: Vec<(Isbn13, String)> = {
            let db = Database::open(&self.db_path)?;
            db.list_books_needing_emotions()?
                .into_iter()
                .filter_map(|b| b.description.map(|d| (b.isbn13, d)))
                .collect()
        };

        let mut summary = EmotionSummary::default();
        let mut profiles: Vec<EmotionProfile> = Vec::with_capacity(pending.len());

        for (isbn13, description) in pending {
            let sentences = split_sentences(&description);
            if sentences.is_empty() {
                continue;
            }

            match self.client.score_sentences(&sentences).await {
                Ok(per_sentence) => {
                    let mut profile =
                        EmotionProfile::new(isbn13).with_model(self.client.model());
                    for scores in per_sentence {
                        for (emotion, score) in scores {
                            profile.record(emotion, score);
                        }
                    }
                    profiles.push(profile);
                    summary.scored += 1;
                }
                Err(e) => {
                    log::warn!("Emotion scoring failed for {isbn13}: {e}");
                    summary.skipped += 1;
                }
            }
        }

        let db = Database::open(&self.db_path)?;
        for profile in &profiles {
            db.upsert_emotion_profile(profile)?;
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Stage for EmotionStage {
    fn name(&self) -> &str {
        "emotions"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.run().await {
            Ok(summary) => {
                log::info!(
                    "Emotions complete: {} scored, {} skipped",
                    summary.scored,
                    summary.skipped
                );
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Emotions failed: {e}"
            ))),
        }
    }
}
