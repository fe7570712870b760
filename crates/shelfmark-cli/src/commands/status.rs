use anyhow::Result;

use shelfmark_core::schema::Database;
use shelfmark_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;

    let books = db.count_books()?;
    let missing_description = db.count_missing_description()?;
    let unclassified = db.count_unclassified()?;
    let emotion_scored = db.count_emotion_scored()?;
    let indexed = db.count_indexed()?;

    println!("\n📊 Shelfmark Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Books:               {books}");
    println!("  Missing description: {missing_description}");
    println!("  Unclassified:        {unclassified}");
    println!("  Emotion scored:      {emotion_scored}");
    println!("  Indexed:             {indexed}");

    if books == 0 {
        println!("\n  Run `shelfmark load <dataset.csv>` to load a catalog");
    } else if unclassified > 0 {
        println!("\n  Run `shelfmark classify` to categorize these books");
    } else if indexed < books - missing_description {
        println!("\n  Run `shelfmark index` to finish building the collection");
    }

    Ok(())
}
