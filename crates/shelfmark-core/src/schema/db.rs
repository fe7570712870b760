use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

use crate::error::Result;
use crate::model::{BookRecord, Classification, Emotion, EmotionProfile, Isbn13};

use super::migrations::MIGRATIONS;

/// A database connection with CRUD methods for the book catalog.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Book CRUD
impl Database {
    /// Insert a book, overwriting any prior row with the same ISBN-13.
    ///
    /// Re-running the clean stage over the same dataset is therefore
    /// idempotent.
    pub fn upsert_book(&self, book: &BookRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO books (
                isbn13, title, subtitle, authors, description,
                raw_category, simple_category, published_year, num_pages,
                average_rating, ratings_count, thumbnail, age_of_book,
                missing_description, indexed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT(isbn13) DO UPDATE SET
                title = ?2, subtitle = ?3, authors = ?4, description = ?5,
                raw_category = ?6, simple_category = ?7, published_year = ?8,
                num_pages = ?9, average_rating = ?10, ratings_count = ?11,
                thumbnail = ?12, age_of_book = ?13, missing_description = ?14,
                indexed_at = ?15, updated_at = ?17",
            rusqlite::params![
                book.isbn13.as_u64() as i64,
                book.title,
                book.subtitle,
                book.authors,
                book.description,
                book.raw_category,
                book.simple_category,
                book.published_year,
                book.num_pages.map(i64::from),
                book.average_rating,
                book.ratings_count.map(i64::from),
                book.thumbnail,
                book.age_of_book,
                i32::from(book.missing_description),
                book.indexed_at.map(|t| t.to_rfc3339()),
                book.created_at.to_rfc3339(),
                book.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch one book by ISBN-13.
    pub fn get_book(&self, isbn13: Isbn13) -> Result<Option<BookRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE isbn13 = ?1"
        ))?;
        let mut rows = stmt.query_map([isbn13.as_u64() as i64], row_to_book)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List every book ordered by ISBN-13.
    pub fn list_books(&self) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY isbn13"
        ))?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Fetch books in the exact order of the given identifiers, skipping
    /// identifiers with no catalog row. Used to join search hits back to
    /// the catalog.
    pub fn get_books_by_isbns(&self, isbns: &[Isbn13]) -> Result<Vec<BookRecord>> {
        let mut books = Vec::with_capacity(isbns.len());
        for &isbn in isbns {
            if let Some(book) = self.get_book(isbn)? {
                books.push(book);
            }
        }
        Ok(books)
    }

    /// Books awaiting classification (no simple category yet).
    pub fn list_unclassified_books(&self) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books
             WHERE simple_category IS NULL
             ORDER BY isbn13"
        ))?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Books with a description but no emotion scores yet.
    pub fn list_books_needing_emotions(&self) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books
             WHERE missing_description = 0
               AND isbn13 NOT IN (SELECT DISTINCT isbn13 FROM emotion_scores)
             ORDER BY isbn13"
        ))?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Books eligible for the embedding index: description present and
    /// not yet upserted into the vector store.
    pub fn list_indexable_books(&self) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books
             WHERE missing_description = 0
               AND indexed_at IS NULL
             ORDER BY isbn13"
        ))?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Record that a book's vector has been upserted into the store.
    pub fn mark_indexed(&self, isbn13: Isbn13, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE books SET indexed_at = ?2, updated_at = ?2 WHERE isbn13 = ?1",
            rusqlite::params![isbn13.as_u64() as i64, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

// Classification CRUD
impl Database {
    /// Store a classification result and project the label onto the
    /// book's simple category. Overwrites any prior result for the book.
    pub fn apply_classification(&self, classification: &Classification) -> Result<()> {
        self.conn.execute(
            "INSERT INTO classifications (isbn13, label, confidence, model, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(isbn13) DO UPDATE SET
                label = ?2, confidence = ?3, model = ?4, fetched_at = ?5",
            rusqlite::params![
                classification.isbn13.as_u64() as i64,
                classification.label,
                classification.confidence,
                classification.model,
                classification.fetched_at.to_rfc3339(),
            ],
        )?;
        self.conn.execute(
            "UPDATE books SET simple_category = ?2, updated_at = ?3 WHERE isbn13 = ?1",
            rusqlite::params![
                classification.isbn13.as_u64() as i64,
                classification.label,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch the classification result for one book.
    pub fn get_classification(&self, isbn13: Isbn13) -> Result<Option<Classification>> {
        let mut stmt = self.conn.prepare(
            "SELECT isbn13, label, confidence, model, fetched_at
             FROM classifications WHERE isbn13 = ?1",
        )?;
        let mut rows = stmt.query_map([isbn13.as_u64() as i64], |row| {
            let isbn: i64 = row.get(0)?;
            let label: String = row.get(1)?;
            let confidence: f64 = row.get(2)?;
            let model: String = row.get(3)?;
            let fetched_at: String = row.get(4)?;
            let mut classification =
                Classification::new(Isbn13::from_raw(isbn as u64), label, confidence)
                    .with_model(model);
            classification.fetched_at = parse_timestamp(&fetched_at);
            Ok(classification)
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}

// Emotion CRUD
impl Database {
    /// Store all seven emotion scores for a book, overwriting prior rows.
    pub fn upsert_emotion_profile(&self, profile: &EmotionProfile) -> Result<()> {
        for (emotion, score) in profile.iter() {
            self.conn.execute(
                "INSERT INTO emotion_scores (isbn13, emotion, score, model, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(isbn13, emotion) DO UPDATE SET
                    score = ?3, model = ?4, fetched_at = ?5",
                rusqlite::params![
                    profile.isbn13.as_u64() as i64,
                    emotion.as_str(),
                    score,
                    profile.model,
                    profile.fetched_at.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }

    /// Fetch the emotion profile for one book, if scored.
    pub fn get_emotion_profile(&self, isbn13: Isbn13) -> Result<Option<EmotionProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT emotion, score, model, fetched_at
             FROM emotion_scores WHERE isbn13 = ?1",
        )?;
        let rows = stmt
            .query_map([isbn13.as_u64() as i64], |row| {
                let emotion: String = row.get(0)?;
                let score: f64 = row.get(1)?;
                let model: String = row.get(2)?;
                let fetched_at: String = row.get(3)?;
                Ok((emotion, score, model, fetched_at))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut profile = EmotionProfile::new(isbn13);
        for (label, score, model, fetched_at) in rows {
            if let Some(emotion) = Emotion::from_label(&label) {
                profile.set(emotion, score);
                profile.model = model;
                profile.fetched_at = parse_timestamp(&fetched_at);
            }
        }
        Ok(Some(profile))
    }
}

// Status counts
impl Database {
    pub fn count_books(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM books")
    }

    pub fn count_missing_description(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM books WHERE missing_description = 1")
    }

    pub fn count_unclassified(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM books WHERE simple_category IS NULL")
    }

    pub fn count_emotion_scored(&self) -> Result<usize> {
        self.count("SELECT COUNT(DISTINCT isbn13) FROM emotion_scores")
    }

    pub fn count_indexed(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM books WHERE indexed_at IS NOT NULL")
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

const BOOK_COLUMNS: &str = "isbn13, title, subtitle, authors, description, \
     raw_category, simple_category, published_year, num_pages, \
     average_rating, ratings_count, thumbnail, age_of_book, \
     missing_description, indexed_at, created_at, updated_at";

fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<BookRecord> {
    let isbn: i64 = row.get(0)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;
    let indexed_at: Option<String> = row.get(14)?;

    Ok(BookRecord {
        isbn13: Isbn13::from_raw(isbn as u64),
        title: row.get(1)?,
        subtitle: row.get(2)?,
        authors: row.get(3)?,
        description: row.get(4)?,
        raw_category: row.get(5)?,
        simple_category: row.get(6)?,
        published_year: row.get(7)?,
        num_pages: row.get::<_, Option<i64>>(8)?.map(|v| v as u32),
        average_rating: row.get(9)?,
        ratings_count: row.get::<_, Option<i64>>(10)?.map(|v| v as u32),
        thumbnail: row.get(11)?,
        age_of_book: row.get(12)?,
        missing_description: row.get::<_, i64>(13)? != 0,
        indexed_at: indexed_at.as_deref().map(parse_timestamp),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Parse an RFC 3339 timestamp column, falling back to the epoch for
/// rows written by hand or by older tooling.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(Into::into)
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookRecord, Classification, Emotion, EmotionProfile, Isbn13};

    fn isbn() -> Isbn13 {
        Isbn13::from_raw(9_780_002_005_883)
    }

    fn sample_book() -> BookRecord {
        let mut book = BookRecord::new(isbn(), "Gilead")
            .with_authors("Marilynne Robinson")
            .with_description("A story of fathers and sons, grace and forgiveness.")
            .with_raw_category("Fiction")
            .with_published_year(2004);
        book.derive_columns(2024);
        book
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_book_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let book = sample_book();
        db.upsert_book(&book).unwrap();

        let loaded = db.get_book(isbn()).unwrap().unwrap();
        assert_eq!(loaded.title, "Gilead");
        assert_eq!(loaded.age_of_book, 20);
        assert!(!loaded.missing_description);
        assert_eq!(loaded.published_year, Some(2004));
    }

    #[test]
    fn test_upsert_book_overwrites() {
        let db = Database::open_in_memory().unwrap();
        let mut book = sample_book();
        db.upsert_book(&book).unwrap();

        book.title = "Gilead (Revised)".to_string();
        db.upsert_book(&book).unwrap();

        assert_eq!(db.count_books().unwrap(), 1);
        let loaded = db.get_book(isbn()).unwrap().unwrap();
        assert_eq!(loaded.title, "Gilead (Revised)");
    }

    #[test]
    fn test_classification_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_book(&sample_book()).unwrap();

        let classification =
            Classification::new(isbn(), "Fiction", 0.93).with_model("facebook/bart-large-mnli");
        db.apply_classification(&classification).unwrap();

        let loaded = db.get_classification(isbn()).unwrap().unwrap();
        assert_eq!(loaded.label, "Fiction");
        assert!((loaded.confidence - 0.93).abs() < 1e-9);

        // Label is projected onto the book row.
        let book = db.get_book(isbn()).unwrap().unwrap();
        assert_eq!(book.simple_category.as_deref(), Some("Fiction"));
        assert!(db.list_unclassified_books().unwrap().is_empty());
    }

    #[test]
    fn test_emotion_profile_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_book(&sample_book()).unwrap();

        let mut profile = EmotionProfile::new(isbn()).with_model("emotion-model");
        profile.record(Emotion::Joy, 0.8);
        profile.record(Emotion::Sadness, 0.4);
        db.upsert_emotion_profile(&profile).unwrap();

        let loaded = db.get_emotion_profile(isbn()).unwrap().unwrap();
        assert_eq!(loaded.score(Emotion::Joy), 0.8);
        assert_eq!(loaded.score(Emotion::Sadness), 0.4);
        assert_eq!(loaded.score(Emotion::Disgust), 0.0);
        assert_eq!(loaded.iter().count(), 7);

        assert_eq!(db.count_emotion_scored().unwrap(), 1);
        assert!(db.list_books_needing_emotions().unwrap().is_empty());
    }

    #[test]
    fn test_mark_indexed() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_book(&sample_book()).unwrap();
        assert_eq!(db.count_indexed().unwrap(), 0);

        db.mark_indexed(isbn(), Utc::now()).unwrap();
        assert_eq!(db.count_indexed().unwrap(), 1);
        assert!(db.get_book(isbn()).unwrap().unwrap().indexed_at.is_some());
        assert!(db.list_indexable_books().unwrap().is_empty());
    }

    #[test]
    fn test_get_books_by_isbns_preserves_order() {
        let db = Database::open_in_memory().unwrap();
        let mut first = sample_book();
        first.isbn13 = Isbn13::from_raw(1_111_111_111_111);
        let mut second = sample_book();
        second.isbn13 = Isbn13::from_raw(2_222_222_222_222);
        db.upsert_book(&first).unwrap();
        db.upsert_book(&second).unwrap();

        let found = db
            .get_books_by_isbns(&[
                second.isbn13,
                Isbn13::from_raw(9_999_999_999_999),
                first.isbn13,
            ])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].isbn13, second.isbn13);
        assert_eq!(found[1].isbn13, first.isbn13);
    }

    #[test]
    fn test_list_books_needing_emotions_skips_missing_description() {
        let db = Database::open_in_memory().unwrap();
        let mut blank = BookRecord::new(Isbn13::from_raw(3_333_333_333_333), "No Blurb");
        blank.derive_columns(2024);
        db.upsert_book(&blank).unwrap();
        db.upsert_book(&sample_book()).unwrap();

        let pending = db.list_books_needing_emotions().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].isbn13, isbn());
    }
}
