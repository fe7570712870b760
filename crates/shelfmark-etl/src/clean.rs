//! Clean stage: load the raw CSV dataset into the catalog.
//!
//! Rows missing an ISBN-13 or a title are rejected. Missing
//! descriptions are tolerated and flagged; descriptions shorter than
//! the configured word threshold are treated as too thin to ever embed
//! or classify usefully, and those rows are removed. Derived columns
//! (book age, missing-description flag) are computed here.

use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use shelfmark_core::model::{BookRecord, Isbn13};
use shelfmark_core::schema::Database;
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::ServiceResult;

/// One row of the source dataset, as serialized in the CSV.
///
/// Numeric columns arrive as floats ("2004.0") in the source data, so
/// everything is deserialized leniently and narrowed afterwards.
#[derive(Debug, Default, Deserialize)]
struct RawBookRow {
    #[serde(default)]
    isbn13: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_year: Option<f64>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    num_pages: Option<f64>,
    #[serde(default)]
    ratings_count: Option<f64>,
}

/// Counters reported after a clean run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanSummary {
    /// Rows read from the CSV.
    pub read: usize,
    /// Rows rejected for a missing/invalid ISBN-13 or missing title.
    pub rejected: usize,
    /// Rows removed for a description below the word threshold.
    pub dropped_short: usize,
    /// Retained rows flagged for having no description at all.
    pub flagged_missing_description: usize,
    /// Rows written to the catalog.
    pub loaded: usize,
}

/// The Clean stage: read CSV rows, derive columns, persist books.
#[derive(Debug)]
pub struct CleanStage {
    csv_path: PathBuf,
    db_path: PathBuf,
    min_description_words: usize,
}

impl CleanStage {
    #[must_use]
    pub fn new(csv_path: PathBuf, db_path: PathBuf, min_description_words: usize) -> Self {
        Self {
            csv_path,
            db_path,
            min_description_words,
        }
    }

    fn non_empty(value: Option<String>) -> Option<String> {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Convert one CSV row, or `None` when its identity fields are
    /// missing or malformed.
    fn row_to_book(row: RawBookRow, reference_year: i32) -> Option<BookRecord> {
        let isbn13 = Isbn13::parse(row.isbn13.as_deref()?).ok()?;
        let title = Self::non_empty(row.title)?;

        let mut book = BookRecord::new(isbn13, title);
        book.subtitle = Self::non_empty(row.subtitle);
        book.authors = Self::non_empty(row.authors);
        book.raw_category = Self::non_empty(row.categories);
        book.thumbnail = Self::non_empty(row.thumbnail);
        book.description = Self::non_empty(row.description);
        book.published_year = row.published_year.map(|y| y as i32);
        book.num_pages = row.num_pages.filter(|&n| n >= 0.0).map(|n| n as u32);
        book.average_rating = row.average_rating;
        book.ratings_count = row.ratings_count.filter(|&n| n >= 0.0).map(|n| n as u32);
        book.derive_columns(reference_year);
        Some(book)
    }

    /// Run the clean pass synchronously.
    pub fn run(&self) -> ServiceResult<CleanSummary> {
        let db = Database::open(&self.db_path)?;
        self.load_into(&db)
    }

    fn load_into(&self, db: &Database) -> ServiceResult<CleanSummary> {
        let reference_year = Utc::now().year();
        let mut summary = CleanSummary::default();

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.csv_path)?;

        for result in reader.deserialize::<RawBookRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping malformed CSV row: {e}");
                    summary.read += 1;
                    summary.rejected += 1;
                    continue;
                }
            };
            summary.read += 1;

            let Some(book) = Self::row_to_book(row, reference_year) else {
                summary.rejected += 1;
                continue;
            };

            if book.missing_description {
                summary.flagged_missing_description += 1;
            } else if book.description_word_count() < self.min_description_words {
                log::debug!(
                    "Dropping {} ({} description words, need {})",
                    book.isbn13,
                    book.description_word_count(),
                    self.min_description_words
                );
                summary.dropped_short += 1;
                continue;
            }

            db.upsert_book(&book)?;
            summary.loaded += 1;
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Stage for CleanStage {
    fn name(&self) -> &str {
        "clean"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Starting clean of {}", self.csv_path.display());

        match self.run() {
            Ok(summary) => {
                log::info!(
                    "Clean complete: {} read, {} loaded, {} rejected, {} dropped short, {} missing description",
                    summary.read,
                    summary.loaded,
                    summary.rejected,
                    summary.dropped_short,
                    summary.flagged_missing_description
                );
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Clean failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str =
        "isbn13,title,subtitle,authors,categories,thumbnail,description,published_year,average_rating,num_pages,ratings_count";

    fn long_description() -> String {
        std::iter::repeat("word").take(30).collect::<Vec<_>>().join(" ")
    }

    fn write_csv(dir: &TempDir, rows: &[String]) -> PathBuf {
        let path = dir.path().join("books.csv");
        let mut contents = String::from(HEADER);
        for row in rows {
            contents.push('\n');
            contents.push_str(row);
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn run_clean(dir: &TempDir, rows: &[String]) -> (CleanSummary, Database) {
        let csv_path = write_csv(dir, rows);
        let db_path = dir.path().join("test.db");
        let stage = CleanStage::new(csv_path, db_path.clone(), 25);
        let summary = stage.run().unwrap();
        (summary, Database::open(&db_path).unwrap())
    }

    #[test]
    fn test_loads_valid_row_with_derived_columns() {
        let dir = TempDir::new().unwrap();
        let row = format!(
            "9780002005883,Gilead,,Marilynne Robinson,Fiction,http://img,{},2004.0,3.85,247.0,361.0",
            long_description()
        );
        let (summary, db) = run_clean(&dir, &[row]);

        assert_eq!(summary.read, 1);
        assert_eq!(summary.loaded, 1);
        let book = db
            .get_book(Isbn13::from_raw(9_780_002_005_883))
            .unwrap()
            .unwrap();
        assert_eq!(book.published_year, Some(2004));
        assert_eq!(book.num_pages, Some(247));
        assert_eq!(book.age_of_book, Utc::now().year() - 2004);
        assert!(!book.missing_description);
    }

    #[test]
    fn test_rejects_missing_isbn() {
        let dir = TempDir::new().unwrap();
        let row = format!(",No Identity,,A,Fiction,,{},2000.0,4.0,100.0,5.0", long_description());
        let (summary, db) = run_clean(&dir, &[row]);

        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.loaded, 0);
        assert_eq!(db.count_books().unwrap(), 0);
    }

    #[test]
    fn test_rejects_missing_title() {
        let dir = TempDir::new().unwrap();
        let row = format!("9780002005883,,,A,Fiction,,{},2000.0,4.0,100.0,5.0", long_description());
        let (summary, _) = run_clean(&dir, &[row]);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn test_drops_short_description() {
        let dir = TempDir::new().unwrap();
        let row = "9780002005883,Thin Blurb,,A,Fiction,,too short to keep,2000.0,4.0,100.0,5.0"
            .to_string();
        let (summary, db) = run_clean(&dir, &[row]);

        assert_eq!(summary.dropped_short, 1);
        assert_eq!(summary.loaded, 0);
        assert_eq!(db.count_books().unwrap(), 0);
    }

    #[test]
    fn test_flags_missing_description_but_keeps_row() {
        let dir = TempDir::new().unwrap();
        let row = "9780002005883,No Blurb,,A,Fiction,,,2000.0,4.0,100.0,5.0".to_string();
        let (summary, db) = run_clean(&dir, &[row]);

        assert_eq!(summary.flagged_missing_description, 1);
        assert_eq!(summary.loaded, 1);
        let book = db
            .get_book(Isbn13::from_raw(9_780_002_005_883))
            .unwrap()
            .unwrap();
        assert!(book.missing_description);
        // Derived age is present even on flagged rows.
        assert_eq!(book.age_of_book, Utc::now().year() - 2000);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let row = format!(
            "9780002005883,Gilead,,Marilynne Robinson,Fiction,,{},2004.0,3.85,247.0,361.0",
            long_description()
        );
        let csv_path = write_csv(&dir, &[row]);
        let db_path = dir.path().join("test.db");
        let stage = CleanStage::new(csv_path, db_path.clone(), 25);

        stage.run().unwrap();
        stage.run().unwrap();

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.count_books().unwrap(), 1);
    }

    #[test]
    fn test_run_fails_on_missing_csv() {
        let dir = TempDir::new().unwrap();
        let stage = CleanStage::new(
            dir.path().join("absent.csv"),
            dir.path().join("test.db"),
            25,
        );
        assert!(stage.run().is_err());
    }
}
