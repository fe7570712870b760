/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Books (one row per ISBN-13, created by the clean stage)
CREATE TABLE IF NOT EXISTS books (
    isbn13 INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    subtitle TEXT,
    authors TEXT,
    description TEXT,
    raw_category TEXT,
    simple_category TEXT,
    published_year INTEGER,
    num_pages INTEGER,
    average_rating REAL,
    ratings_count INTEGER,
    thumbnail TEXT,
    age_of_book INTEGER NOT NULL DEFAULT 0,
    missing_description INTEGER NOT NULL DEFAULT 0,
    indexed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_simple_category ON books(simple_category);
CREATE INDEX IF NOT EXISTS idx_books_indexed_at ON books(indexed_at);

-- Classification results (one per book, overwritten on re-runs)
CREATE TABLE IF NOT EXISTS classifications (
    isbn13 INTEGER PRIMARY KEY REFERENCES books(isbn13),
    label TEXT NOT NULL,
    confidence REAL NOT NULL,
    model TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

-- Emotion scores (seven rows per scored book)
CREATE TABLE IF NOT EXISTS emotion_scores (
    isbn13 INTEGER NOT NULL REFERENCES books(isbn13),
    emotion TEXT NOT NULL,
    score REAL NOT NULL,
    model TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    PRIMARY KEY (isbn13, emotion)
);

CREATE INDEX IF NOT EXISTS idx_emotion_scores_isbn13 ON emotion_scores(isbn13);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
