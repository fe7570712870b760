//! Index stage: embed descriptions and load them into the vector store.
//!
//! Unlike the enrichment stages, an embedding or store failure aborts
//! the run. A partially written collection is worse than a late one,
//! and rows already marked indexed stay marked, so a rerun resumes
//! where the failure happened.

use std::path::PathBuf;

use chrono::Utc;
use shelfmark_core::model::Isbn13;
use shelfmark_core::schema::Database;
use shelfmark_search::{
    Embedder, EmbeddingEntry, OpenAiEmbedder, QdrantStore, VectorStore,
};
use treadle::{Stage, StageContext, StageOutcome};

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};

/// Counters reported after an index run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    /// Books embedded and upserted into the vector store.
    pub indexed: usize,
    /// Embedding batches sent.
    pub batches: usize,
}

/// The Index stage: embed tagged descriptions and upsert them.
#[derive(Debug)]
pub struct IndexStage<E, S> {
    embedder: E,
    store: S,
    db_path: PathBuf,
    batch_size: usize,
}

impl IndexStage<OpenAiEmbedder, QdrantStore> {
    pub fn from_config(config: &Config, db_path: PathBuf) -> ServiceResult<Self> {
        let api_key = config
            .openai_api_key
            .as_deref()
            .ok_or(ServiceError::MissingCredentials("openai_api_key"))?;
        let embedder = OpenAiEmbedder::new(
            &config.openai_base_url,
            api_key,
            &config.embedding_model,
            config.embedding_dimension,
        )?;
        let store = QdrantStore::new(&config.qdrant_url, &config.collection)?;
        Ok(Self::new(embedder, store, db_path, config.embed_batch_size))
    }
}

impl<E: Embedder, S: VectorStore> IndexStage<E, S> {
    #[must_use]
    pub fn new(embedder: E, store: S, db_path: PathBuf, batch_size: usize) -> Self {
        Self {
            embedder,
            store,
            db_path,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(&self) -> ServiceResult<IndexSummary> {
        // Read phase: everything needed for the entries, then drop the
        // connection before the network awaits.
        let pending: Vec<(EmbeddingEntry, String)> = {
            let db = Database::open(&self.db_path)?;
            db.list_indexable_books()?
                .into_iter()
                .filter_map(|book| {
                    let text = book.tagged_description()?;
                    let entry = EmbeddingEntry {
                        isbn13: book.isbn13,
                        vector: Vec::new(),
                        source_text: text.clone(),
                        title: book.title_and_subtitle(),
                        authors: book.authors,
                        simple_category: book.simple_category,
                    };
                    Some((entry, text))
                })
                .collect()
        };

        let mut summary = IndexSummary::default();
        if pending.is_empty() {
            return Ok(summary);
        }

        self.store
            .ensure_collection(self.embedder.dimension())
            .await?;

        let mut indexed: Vec<Isbn13> = Vec::with_capacity(pending.len());
        for chunk in pending.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;

            let entries: Vec<EmbeddingEntry> = chunk
                .iter()
                .zip(vectors)
                .map(|((entry, _), vector)| EmbeddingEntry {
                    vector,
                    ..entry.clone()
                })
                .collect();
            self.store.upsert(&entries).await?;

            indexed.extend(entries.iter().map(|e| e.isbn13));
            summary.batches += 1;
        }

        let now = Utc::now();
        let db = Database::open(&self.db_path)?;
        for isbn13 in &indexed {
            db.mark_indexed(*isbn13, now)?;
        }
        summary.indexed = indexed.len();

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl<E: Embedder + std::fmt::Debug + 'static, S: VectorStore + std::fmt::Debug + 'static> Stage
    for IndexStage<E, S>
{
    fn name(&self) -> &str {
        "index"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.run().await {
            Ok(summary) => {
                log::info!(
                    "Index complete: {} books in {} batches",
                    summary.indexed,
                    summary.batches
                );
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Index failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_core::model::BookRecord;
    use shelfmark_search::{ScoredHit, SearchResult};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StubEmbedder {
        dimension: usize,
    }

    #[async_trait::async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; self.dimension]).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        upserts: Mutex<Vec<EmbeddingEntry>>,
        ensured_dimension: Mutex<Option<usize>>,
    }

    #[async_trait::async_trait]
    impl VectorStore for RecordingStore {
        async fn ensure_collection(&self, dimension: usize) -> SearchResult<()> {
            *self.ensured_dimension.lock().unwrap() = Some(dimension);
            Ok(())
        }

        async fn upsert(&self, entries: &[EmbeddingEntry]) -> SearchResult<()> {
            self.upserts.lock().unwrap().extend_from_slice(entries);
            Ok(())
        }

        async fn search(&self, _vector: &[f32], _limit: usize) -> SearchResult<Vec<ScoredHit>> {
            Ok(Vec::new())
        }
    }

    fn seed_book(db_path: &std::path::Path, isbn: u64, description: Option<&str>) {
        let db = Database::open(db_path).unwrap();
        let mut book = BookRecord::new(Isbn13::from_raw(isbn), format!("Book {isbn}"));
        book.description = description.map(String::from);
        book.simple_category = Some("Fiction".to_string());
        book.derive_columns(2026);
        db.upsert_book(&book).unwrap();
    }

    #[tokio::test]
    async fn test_run_embeds_and_marks_indexed() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(&db_path, 9_780_000_000_020, Some("A long tale of the sea."));
        seed_book(&db_path, 9_780_000_000_021, Some("A short tale of the land."));

        let store = RecordingStore::default();
        let stage = IndexStage::new(StubEmbedder { dimension: 4 }, store, db_path.clone(), 10);
        let summary = stage.run().await.unwrap();

        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.batches, 1);
        assert_eq!(*stage.store.ensured_dimension.lock().unwrap(), Some(4));

        let upserts = stage.store.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 2);
        // Tagged text leads with the identifier so hits map back to rows.
        assert!(upserts[0].source_text.starts_with("9780000000020 "));
        assert_eq!(upserts[0].vector.len(), 4);

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.count_indexed().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_batches_by_configured_size() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        for i in 0..5 {
            seed_book(&db_path, 9_780_000_000_030 + i, Some("Words enough to index."));
        }

        let stage = IndexStage::new(
            StubEmbedder { dimension: 4 },
            RecordingStore::default(),
            db_path,
            2,
        );
        let summary = stage.run().await.unwrap();
        assert_eq!(summary.indexed, 5);
        assert_eq!(summary.batches, 3);
    }

    #[tokio::test]
    async fn test_run_skips_books_without_description() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(&db_path, 9_780_000_000_040, None);

        let stage = IndexStage::new(
            StubEmbedder { dimension: 4 },
            RecordingStore::default(),
            db_path,
            10,
        );
        let summary = stage.run().await.unwrap();
        assert_eq!(summary.indexed, 0);
        assert_eq!(summary.batches, 0);
    }

    #[tokio::test]
    async fn test_rerun_indexes_nothing_new() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        seed_book(&db_path, 9_780_000_000_050, Some("A story worth indexing."));

        let stage = IndexStage::new(
            StubEmbedder { dimension: 4 },
            RecordingStore::default(),
            db_path,
            10,
        );
        assert_eq!(stage.run().await.unwrap().indexed, 1);
        assert_eq!(stage.run().await.unwrap().indexed, 0);
    }
}
