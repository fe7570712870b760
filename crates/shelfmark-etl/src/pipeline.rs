use std::path::PathBuf;
use treadle::Workflow;

use crate::config::Config;
use crate::{ClassifyStage, CleanStage, EmotionStage, IndexStage};

/// Build the clean + classify + emotions + index pipeline.
///
/// Classify and emotions both depend only on clean and can run
/// concurrently; index waits for both so category filters and tone
/// ordering are available as soon as the collection is queryable.
///
/// # Errors
/// Returns an error if a stage cannot be constructed or the workflow
/// cannot be built.
pub fn build_pipeline(
    config: &Config,
    csv_path: PathBuf,
    db_path: PathBuf,
) -> treadle::Result<Workflow> {
    let clean_stage = CleanStage::new(csv_path, db_path.clone(), config.min_description_words);
    let classify_stage = ClassifyStage::from_config(config, db_path.clone()).map_err(|e| {
        treadle::TreadleError::InvalidWorkflow(format!("Failed to create classify stage: {e}"))
    })?;
    let emotion_stage = EmotionStage::from_config(config, db_path.clone()).map_err(|e| {
        treadle::TreadleError::InvalidWorkflow(format!("Failed to create emotions stage: {e}"))
    })?;
    let index_stage = IndexStage::from_config(config, db_path).map_err(|e| {
        treadle::TreadleError::InvalidWorkflow(format!("Failed to create index stage: {e}"))
    })?;

    Workflow::builder()
        .stage("clean", clean_stage)
        .stage("classify", classify_stage)
        .stage("emotions", emotion_stage)
        .stage("index", index_stage)
        .dependency("classify", "clean")
        .dependency("emotions", "clean")
        .dependency("index", "classify")
        .dependency("index", "emotions")
        .build()
}
