use anyhow::Result;

use shelfmark_core::schema::Database;
use shelfmark_etl::{ClassifyStage, Config};

pub async fn run_classify(config: &Config) -> Result<()> {
    log::info!("Starting classification");

    let pending = {
        let db = Database::open(&config.database_path)?;
        db.count_unclassified()?
    };

    println!("Found {pending} unclassified books in catalog");
    if pending == 0 {
        println!("Nothing to classify");
        return Ok(());
    }

    let stage = ClassifyStage::from_config(config, config.database_path.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create classify stage: {e}"))?;
    let summary = stage.run().await?;

    println!("\n✓ Classification complete");
    println!("  From category map: {}", summary.from_map);
    println!("  Model predictions: {}", summary.predicted);
    println!("  Unknown:           {}", summary.unknown);
    println!("  Skipped (errors):  {}", summary.skipped);

    if summary.skipped > 0 {
        println!("\nRe-run 'shelfmark classify' to retry the skipped books");
    }

    Ok(())
}
