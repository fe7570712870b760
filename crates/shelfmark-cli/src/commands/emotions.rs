use anyhow::Result;

use shelfmark_core::schema::Database;
use shelfmark_etl::{Config, EmotionStage};

pub async fn run_emotions(config: &Config) -> Result<()> {
    log::info!("Starting emotion scoring");

    let pending = {
        let db = Database::open(&config.database_path)?;
        db.list_books_needing_emotions()?.len()
    };

    println!("Found {pending} books without emotion scores");
    if pending == 0 {
        println!("Nothing to score");
        return Ok(());
    }

    let stage = EmotionStage::from_config(config, config.database_path.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create emotions stage: {e}"))?;
    let summary = stage.run().await?;

    println!("\n✓ Emotion scoring complete");
    println!("  Books scored:     {}", summary.scored);
    println!("  Skipped (errors): {}", summary.skipped);

    if summary.skipped > 0 {
        println!("\nRe-run 'shelfmark emotions' to retry the skipped books");
    }

    Ok(())
}
