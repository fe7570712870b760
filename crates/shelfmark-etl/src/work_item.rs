use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use treadle::WorkItem;

/// A catalog build job flowing through the pipeline.
///
/// This is the treadle `WorkItem` carried through the clean → classify
/// → emotions → index stages. One job covers one dataset snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogJob {
    /// Unique ID for this job.
    id: String,
    /// Path to the source CSV dataset.
    pub dataset: PathBuf,
}

impl CatalogJob {
    #[must_use]
    pub fn new(id: impl Into<String>, dataset: PathBuf) -> Self {
        Self {
            id: id.into(),
            dataset,
        }
    }
}

impl WorkItem for CatalogJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CatalogJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dataset.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_job_creation() {
        let job = CatalogJob::new("job-1", PathBuf::from("/data/books.csv"));
        assert_eq!(job.id(), "job-1");
        assert_eq!(job.dataset, PathBuf::from("/data/books.csv"));
    }

    #[test]
    fn test_catalog_job_display() {
        let job = CatalogJob::new("job-1", PathBuf::from("/data/books.csv"));
        assert!(format!("{job}").contains("books.csv"));
    }
}
