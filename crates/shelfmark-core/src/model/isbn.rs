use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Stable identifier for a book: its ISBN-13.
///
/// Every derived entity (classification, emotion profile, vector-store
/// entry) references a book by this value. Stored as the raw 13-digit
/// number; no hyphenation is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Isbn13(u64);

impl Isbn13 {
    /// Wrap a raw 13-digit value without validation.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The raw numeric value (used as the vector-store point id).
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse from a string field, rejecting anything that is not exactly
    /// thirteen digits.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.len() != 13 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidData(format!("invalid ISBN-13: {input:?}")));
        }
        let value = trimmed
            .parse::<u64>()
            .map_err(|_| Error::InvalidData(format!("invalid ISBN-13: {input:?}")))?;
        Ok(Self(value))
    }
}

impl fmt::Display for Isbn13 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Isbn13 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
