use anyhow::Result;
use std::path::PathBuf;

use shelfmark_etl::{CleanStage, Config};

pub fn run_load(config: &Config, dataset: PathBuf) -> Result<()> {
    log::info!("Loading dataset {}", dataset.display());

    let stage = CleanStage::new(
        dataset,
        config.database_path.clone(),
        config.min_description_words,
    );
    let summary = stage.run()?;

    println!("\n✓ Load complete");
    println!("  Rows read:            {}", summary.read);
    println!("  Books loaded:         {}", summary.loaded);
    println!("  Rows rejected:        {}", summary.rejected);
    println!("  Short descriptions:   {}", summary.dropped_short);
    println!(
        "  Missing descriptions: {}",
        summary.flagged_missing_description
    );
    println!("\nRun 'shelfmark classify' to categorize the loaded books");

    Ok(())
}
