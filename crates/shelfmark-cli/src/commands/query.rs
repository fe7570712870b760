use anyhow::Result;
use std::str::FromStr;

use shelfmark_core::taxonomy::Tone;
use shelfmark_etl::Config;
use shelfmark_search::{OpenAiEmbedder, QdrantStore, RecommendOptions, Recommender};

/// Rough cut-off for the description shown per result.
const DESCRIPTION_WORDS: usize = 30;

pub async fn run_query(
    config: &Config,
    query: &str,
    category: Option<String>,
    tone: Option<String>,
    limit: usize,
) -> Result<()> {
    let tone = tone
        .map(|t| {
            Tone::from_str(&t).map_err(|_| {
                anyhow::anyhow!(
                    "Unknown tone: {t}\n\nValid tones: happy, surprising, angry, suspenseful, sad"
                )
            })
        })
        .transpose()?;

    let api_key = config
        .openai_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("openai_api_key is not set; run 'shelfmark config'"))?;
    let embedder = OpenAiEmbedder::new(
        &config.openai_base_url,
        api_key,
        &config.embedding_model,
        config.embedding_dimension,
    )?;
    let store = QdrantStore::new(&config.qdrant_url, &config.collection)?;
    let recommender = Recommender::new(embedder, store, config.database_path.clone());

    let options = RecommendOptions {
        final_k: limit,
        category,
        tone,
        ..RecommendOptions::default()
    };

    let results = recommender.recommend(query, &options).await?;

    if results.is_empty() {
        println!("No matches. Has 'shelfmark index' been run?");
        return Ok(());
    }

    println!("\n📚 {} recommendations for \"{query}\"\n", results.len());
    for (rank, rec) in results.iter().enumerate() {
        let book = &rec.book;
        println!("{:2}. {} (score {:.3})", rank + 1, book.title_and_subtitle(), rec.score);
        println!("    by {}", book.display_authors());
        if let Some(category) = &book.simple_category {
            println!("    {category}");
        }
        if let Some(description) = &book.description {
            println!("    {}", truncate_words(description, DESCRIPTION_WORDS));
        }
        println!();
    }

    Ok(())
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        words.join(" ")
    } else {
        format!("{}...", words[..max_words].join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_words_short_text() {
        assert_eq!(truncate_words("a short blurb", 30), "a short blurb");
    }

    #[test]
    fn test_truncate_words_long_text() {
        let text = "one two three four five";
        assert_eq!(truncate_words(text, 3), "one two three...");
    }
}
