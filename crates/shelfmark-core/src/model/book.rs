use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::isbn::Isbn13;

/// Fallback image used when a book has no usable thumbnail.
pub const COVER_NOT_FOUND: &str = "cover-not-found.jpg";

/// A single book in the catalog.
///
/// Created by the clean stage from a raw CSV row, then enriched in place
/// by the classification and emotion stages. Identity is the ISBN-13.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub isbn13: Isbn13,
    pub title: String,
    pub subtitle: Option<String>,

    /// Authors as published in the source dataset (semicolon-separated).
    pub authors: Option<String>,

    pub description: Option<String>,

    /// Category string from the source dataset (e.g. "Juvenile Fiction").
    pub raw_category: Option<String>,

    /// Normalized category, filled by the classification stage.
    pub simple_category: Option<String>,

    pub published_year: Option<i32>,
    pub num_pages: Option<u32>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u32>,

    /// Cover thumbnail URL from the source dataset.
    pub thumbnail: Option<String>,

    /// Years since publication, relative to the year the dataset was
    /// cleaned. Zero when the published year is unknown.
    pub age_of_book: i32,

    /// True when the source row had no description.
    pub missing_description: bool,

    /// Set once the book's description has been upserted into the
    /// vector store.
    pub indexed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookRecord {
    #[must_use]
    pub fn new(isbn13: Isbn13, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            isbn13,
            title: title.into(),
            subtitle: None,
            authors: None,
            description: None,
            raw_category: None,
            simple_category: None,
            published_year: None,
            num_pages: None,
            average_rating: None,
            ratings_count: None,
            thumbnail: None,
            age_of_book: 0,
            missing_description: true,
            indexed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn with_authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = Some(authors.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_raw_category(mut self, category: impl Into<String>) -> Self {
        self.raw_category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_published_year(mut self, year: i32) -> Self {
        self.published_year = Some(year);
        self
    }

    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    /// Recompute the derived columns against a reference year.
    ///
    /// Called by the clean stage after all source fields are set. The
    /// age falls back to zero when the published year is unknown, so
    /// every retained row carries the field.
    pub fn derive_columns(&mut self, reference_year: i32) {
        self.age_of_book = self
            .published_year
            .map(|year| reference_year - year)
            .unwrap_or(0);
        self.missing_description = self
            .description
            .as_deref()
            .map(str::trim)
            .is_none_or(str::is_empty);
    }

    /// Number of words in the description (zero when missing).
    #[must_use]
    pub fn description_word_count(&self) -> usize {
        self.description
            .as_deref()
            .map(|d| d.split_whitespace().count())
            .unwrap_or(0)
    }

    /// Title joined with the subtitle when one exists.
    #[must_use]
    pub fn title_and_subtitle(&self) -> String {
        match &self.subtitle {
            Some(sub) if !sub.trim().is_empty() => format!("{}: {}", self.title, sub),
            _ => self.title.clone(),
        }
    }

    /// The text submitted to the embedding service: the ISBN-13 followed
    /// by the description, so a search hit can be joined back to the
    /// catalog by its first token.
    #[must_use]
    pub fn tagged_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| format!("{} {}", self.isbn13, d.trim()))
    }

    /// High-resolution cover URL, substituting a local placeholder when
    /// the source row had no thumbnail.
    #[must_use]
    pub fn large_thumbnail(&self) -> String {
        match &self.thumbnail {
            Some(url) if !url.trim().is_empty() => format!("{url}&fife=w800"),
            _ => COVER_NOT_FOUND.to_string(),
        }
    }

    /// Authors formatted for display: "A", "A and B", or "A, B, and C".
    #[must_use]
    pub fn display_authors(&self) -> String {
        let raw = self.authors.as_deref().unwrap_or("Unknown");
        let parts: Vec<&str> = raw.split(';').map(str::trim).filter(|s| !s.is_empty()).collect();
        match parts.len() {
            0 => "Unknown".to_string(),
            1 => parts[0].to_string(),
            2 => format!("{} and {}", parts[0], parts[1]),
            n => format!("{}, and {}", parts[..n - 1].join(", "), parts[n - 1]),
        }
    }
}
