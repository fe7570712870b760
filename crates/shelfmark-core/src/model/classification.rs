use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::isbn::Isbn13;

/// Label attached to books whose category could not be determined.
pub const UNKNOWN_LABEL: &str = "unknown";

/// A predicted category for one book.
///
/// Produced by the classification stage, either from the static category
/// map or from the external zero-shot model. Confidence is the model's
/// score for the winning label, always within [0, 1]; map hits carry a
/// confidence of 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub isbn13: Isbn13,
    pub label: String,
    pub confidence: f64,

    /// Identifier of the model (or "category-map") that produced the label.
    pub model: String,

    pub fetched_at: DateTime<Utc>,
}

impl Classification {
    #[must_use]
    pub fn new(isbn13: Isbn13, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            isbn13,
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            model: String::new(),
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The fixed result for books with no description to classify.
    #[must_use]
    pub fn unknown(isbn13: Isbn13) -> Self {
        Self::new(isbn13, UNKNOWN_LABEL, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let isbn = Isbn13::from_raw(9_780_002_005_883);
        assert_eq!(Classification::new(isbn, "Fiction", 1.7).confidence, 1.0);
        assert_eq!(Classification::new(isbn, "Fiction", -0.2).confidence, 0.0);
    }

    #[test]
    fn test_unknown() {
        let c = Classification::unknown(Isbn13::from_raw(9_780_002_005_883));
        assert_eq!(c.label, UNKNOWN_LABEL);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_with_model() {
        let c = Classification::new(Isbn13::from_raw(1_111_111_111_111), "Nonfiction", 0.9)
            .with_model("facebook/bart-large-mnli");
        assert_eq!(c.model, "facebook/bart-large-mnli");
    }
}
