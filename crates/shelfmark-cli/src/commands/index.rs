use anyhow::Result;

use shelfmark_core::schema::Database;
use shelfmark_etl::{Config, IndexStage};

pub async fn run_index(config: &Config) -> Result<()> {
    log::info!("Starting indexing");

    let pending = {
        let db = Database::open(&config.database_path)?;
        db.list_indexable_books()?.len()
    };

    println!("Found {pending} books to index");
    if pending == 0 {
        println!("Nothing to index");
        return Ok(());
    }

    let stage = IndexStage::from_config(config, config.database_path.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create index stage: {e}"))?;
    let summary = stage.run().await?;

    println!("\n✓ Indexing complete");
    println!("  Books indexed: {}", summary.indexed);
    println!("  Batches sent:  {}", summary.batches);
    println!("\nRun 'shelfmark query \"...\"' to search the collection");

    Ok(())
}
