use anyhow::{anyhow, Result};
use std::path::PathBuf;

use shelfmark_etl::{build_pipeline, CatalogJob, Config};

pub async fn run_pipeline(config: &Config, dataset: PathBuf) -> Result<()> {
    log::info!("Starting pipeline for {}", dataset.display());

    let workflow = build_pipeline(config, dataset.clone(), config.database_path.clone())?;

    // Pipeline state lives next to the catalog database.
    let state_path = config
        .database_path
        .parent()
        .ok_or_else(|| anyhow!("Database path has no parent directory"))?
        .join("pipeline.db");
    let mut store = treadle::SqliteStateStore::open(&state_path).await?;

    let job = CatalogJob::new("catalog-build", dataset);

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow.advance(&job, &mut store).await?;

    println!("\n✓ Pipeline complete");
    println!("Run 'shelfmark query \"...\"' to search the collection");
    Ok(())
}
