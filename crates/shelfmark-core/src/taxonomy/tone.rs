use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::model::Emotion;

/// Reader-facing emotional tones offered by the query interface.
///
/// Each tone sorts results by one emotion score from the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Happy,
    Surprising,
    Angry,
    Suspenseful,
    Sad,
}

impl Tone {
    pub const ALL: [Self; 5] = [
        Self::Happy,
        Self::Surprising,
        Self::Angry,
        Self::Suspenseful,
        Self::Sad,
    ];

    /// The emotion score this tone sorts by.
    #[must_use]
    pub const fn emotion(self) -> Emotion {
        match self {
            Self::Happy => Emotion::Joy,
            Self::Surprising => Emotion::Surprise,
            Self::Angry => Emotion::Anger,
            Self::Suspenseful => Emotion::Fear,
            Self::Sad => Emotion::Sadness,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Surprising => "surprising",
            Self::Angry => "angry",
            Self::Suspenseful => "suspenseful",
            Self::Sad => "sad",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidData(format!("unknown tone: {s:?}")))
    }
}
