//! Category normalization for the classification stage.
//!
//! Raw dataset categories (e.g. "Juvenile Fiction", "Literary Criticism")
//! are mapped to a small simple-category vocabulary. Books whose raw
//! category has no mapping fall through to the external zero-shot model,
//! which chooses between the fixed candidate labels.
//!
//! The built-in map covers the most frequent raw categories in the source
//! dataset; a TOML file can replace or extend it:
//!
//! ```toml
//! [categories]
//! "Fiction" = "Fiction"
//! "True Crime" = "Nonfiction"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Candidate labels handed to the zero-shot model.
pub const CANDIDATE_LABELS: &[&str] = &["Fiction", "Nonfiction"];

/// Built-in raw-category to simple-category mapping.
const DEFAULT_MAPPING: &[(&str, &str)] = &[
    ("Fiction", "Fiction"),
    ("Juvenile Fiction", "Children's Fiction"),
    ("Biography & Autobiography", "Nonfiction"),
    ("History", "Nonfiction"),
    ("Literary Criticism", "Nonfiction"),
    ("Philosophy", "Nonfiction"),
    ("Religion", "Nonfiction"),
    ("Comics & Graphic Novels", "Fiction"),
    ("Drama", "Fiction"),
    ("Juvenile Nonfiction", "Children's Nonfiction"),
    ("Science", "Nonfiction"),
    ("Poetry", "Fiction"),
];

/// Raw-category to simple-category map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMap {
    #[serde(default)]
    categories: HashMap<String, String>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self {
            categories: DEFAULT_MAPPING
                .iter()
                .map(|&(raw, simple)| (raw.to_string(), simple.to_string()))
                .collect(),
        }
    }
}

impl CategoryMap {
    /// Load a map from a TOML file, replacing the built-in mapping.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let map: Self = toml::from_str(&contents)?;
        Ok(map)
    }

    /// Look up the simple category for a raw category string.
    #[must_use]
    pub fn simple_category(&self, raw: &str) -> Option<&str> {
        self.categories.get(raw.trim()).map(String::as_str)
    }

    /// Number of raw categories the map covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// The distinct simple categories this map can produce, sorted.
    #[must_use]
    pub fn simple_categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.categories.values().map(String::as_str).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_map_covers_fiction() {
        let map = CategoryMap::default();
        assert_eq!(map.simple_category("Fiction"), Some("Fiction"));
        assert_eq!(map.simple_category("History"), Some("Nonfiction"));
        assert_eq!(
            map.simple_category("Juvenile Fiction"),
            Some("Children's Fiction")
        );
    }

    #[test]
    fn test_unmapped_category() {
        let map = CategoryMap::default();
        assert_eq!(map.simple_category("Basket Weaving"), None);
    }

    #[test]
    fn test_lookup_trims_whitespace() {
        let map = CategoryMap::default();
        assert_eq!(map.simple_category("  Poetry "), Some("Fiction"));
    }

    #[test]
    fn test_simple_categories_sorted_and_deduped() {
        let map = CategoryMap::default();
        let simple = map.simple_categories();
        assert!(simple.contains(&"Fiction"));
        assert!(simple.contains(&"Nonfiction"));
        let mut sorted = simple.clone();
        sorted.sort_unstable();
        assert_eq!(simple, sorted);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[categories]\n\"True Crime\" = \"Nonfiction\"").unwrap();

        let map = CategoryMap::load(file.path()).unwrap();
        assert_eq!(map.simple_category("True Crime"), Some("Nonfiction"));
        // Loaded maps replace the defaults entirely.
        assert_eq!(map.simple_category("Fiction"), None);
    }
}
