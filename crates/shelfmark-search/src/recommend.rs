//! Query interface: natural-language text in, ranked books out.
//!
//! The recommender embeds the query with the same model used at index
//! time, oversamples the nearest-neighbor search, joins the hits back
//! to catalog rows, then applies the optional category filter and tone
//! sort before trimming to the final result count.

use std::collections::HashMap;
use std::path::PathBuf;

use shelfmark_core::model::{BookRecord, Isbn13};
use shelfmark_core::schema::Database;
use shelfmark_core::taxonomy::Tone;

use crate::embedding::Embedder;
use crate::error::SearchResult;
use crate::store::VectorStore;

/// Knobs for one recommendation query.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Results returned to the caller.
    pub final_k: usize,

    /// Hits fetched from the vector store before filtering, so a
    /// category filter still has enough candidates to choose from.
    pub oversample: usize,

    /// Keep only books with this simple category.
    pub category: Option<String>,

    /// Re-order the final results by one emotion score.
    pub tone: Option<Tone>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            final_k: 16,
            oversample: 50,
            category: None,
            tone: None,
        }
    }
}

/// A book with its similarity score.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub book: BookRecord,
    pub score: f32,
}

/// Joins vector search against the catalog database.
#[derive(Debug)]
pub struct Recommender<E, S> {
    embedder: E,
    store: S,
    db_path: PathBuf,
}

impl<E: Embedder, S: VectorStore> Recommender<E, S> {
    #[must_use]
    pub fn new(embedder: E, store: S, db_path: PathBuf) -> Self {
        Self {
            embedder,
            store,
            db_path,
        }
    }

    /// Run one query end to end.
    ///
    /// Every returned identifier exists in the catalog: hits whose book
    /// row has been removed since indexing are dropped during the join.
    pub async fn recommend(
        &self,
        query: &str,
        options: &RecommendOptions,
    ) -> SearchResult<Vec<Recommendation>> {
        let vector = self.embedder.embed_query(query).await?;
        let fetch = options.oversample.max(options.final_k);
        let hits = self.store.search(&vector, fetch).await?;

        log::debug!("Query returned {} raw hits", hits.len());

        // All async work is done; open the catalog for the join.
        let db = Database::open(&self.db_path)?;

        let scores: HashMap<Isbn13, f32> =
            hits.iter().map(|hit| (hit.isbn13, hit.score)).collect();
        let order: Vec<Isbn13> = hits.iter().map(|hit| hit.isbn13).collect();

        let mut results: Vec<Recommendation> = db
            .get_books_by_isbns(&order)?
            .into_iter()
            .filter(|book| match &options.category {
                Some(category) => book.simple_category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .map(|book| {
                let score = scores.get(&book.isbn13).copied().unwrap_or(0.0);
                Recommendation { book, score }
            })
            .take(options.final_k)
            .collect();

        if let Some(tone) = options.tone {
            let emotion = tone.emotion();
            let mut keyed: Vec<(f64, Recommendation)> = Vec::with_capacity(results.len());
            for rec in results {
                let score = db
                    .get_emotion_profile(rec.book.isbn13)?
                    .map(|profile| profile.score(emotion))
                    .unwrap_or(0.0);
                keyed.push((score, rec));
            }
            keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            results = keyed.into_iter().map(|(_, rec)| rec).collect();
        }

        Ok(results)
    }
}
