use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::isbn::Isbn13;

/// The fixed emotion vocabulary scored for every description.
///
/// Matches the label set of the external emotion model; the profile for
/// a book always contains exactly these seven keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Joy,
    Sadness,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Self; 7] = [
        Self::Anger,
        Self::Disgust,
        Self::Fear,
        Self::Joy,
        Self::Sadness,
        Self::Surprise,
        Self::Neutral,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Joy => "joy",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    /// Parse a model label (case-insensitive). Unrecognised labels are
    /// dropped by the caller rather than failing the whole response.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-emotion scores for one book's description.
///
/// Scores are non-negative and are not required to sum to one: the
/// emotion stage keeps the per-sentence maximum for each emotion, so a
/// description can score high on both joy and sadness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile {
    pub isbn13: Isbn13,
    scores: BTreeMap<Emotion, f64>,

    /// Identifier of the model that produced the scores.
    pub model: String,

    pub fetched_at: DateTime<Utc>,
}

impl EmotionProfile {
    /// A profile with every emotion initialised to zero.
    #[must_use]
    pub fn new(isbn13: Isbn13) -> Self {
        Self {
            isbn13,
            scores: Emotion::ALL.into_iter().map(|e| (e, 0.0)).collect(),
            model: String::new(),
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn score(&self, emotion: Emotion) -> f64 {
        self.scores.get(&emotion).copied().unwrap_or(0.0)
    }

    /// Record a score, keeping the maximum seen so far. Negative scores
    /// are treated as zero.
    pub fn record(&mut self, emotion: Emotion, score: f64) {
        let score = score.max(0.0);
        let entry = self.scores.entry(emotion).or_insert(0.0);
        if score > *entry {
            *entry = score;
        }
    }

    /// Overwrite a score directly (used when loading from the database).
    pub fn set(&mut self, emotion: Emotion, score: f64) {
        self.scores.insert(emotion, score.max(0.0));
    }

    /// Iterate over all seven `(emotion, score)` pairs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.scores.iter().map(|(e, s)| (*e, *s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isbn() -> Isbn13 {
        Isbn13::from_raw(9_780_002_005_883)
    }

    #[test]
    fn test_new_profile_has_all_keys() {
        let profile = EmotionProfile::new(isbn());
        let keys: Vec<Emotion> = profile.iter().map(|(e, _)| e).collect();
        assert_eq!(keys.len(), 7);
        for emotion in Emotion::ALL {
            assert!(keys.contains(&emotion));
            assert_eq!(profile.score(emotion), 0.0);
        }
    }

    #[test]
    fn test_record_keeps_maximum() {
        let mut profile = EmotionProfile::new(isbn());
        profile.record(Emotion::Joy, 0.4);
        profile.record(Emotion::Joy, 0.9);
        profile.record(Emotion::Joy, 0.2);
        assert_eq!(profile.score(Emotion::Joy), 0.9);
    }

    #[test]
    fn test_record_clamps_negative() {
        let mut profile = EmotionProfile::new(isbn());
        profile.record(Emotion::Fear, -0.5);
        assert_eq!(profile.score(Emotion::Fear), 0.0);
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Emotion::from_label("Joy"), Some(Emotion::Joy));
        assert_eq!(Emotion::from_label(" sadness "), Some(Emotion::Sadness));
        assert_eq!(Emotion::from_label("ennui"), None);
    }

    #[test]
    fn test_scores_non_negative_invariant() {
        let mut profile = EmotionProfile::new(isbn());
        profile.set(Emotion::Anger, -1.0);
        profile.record(Emotion::Surprise, 0.7);
        assert!(profile.iter().all(|(_, s)| s >= 0.0));
    }
}
