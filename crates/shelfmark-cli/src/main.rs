use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use shelfmark_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "shelfmark", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/shelfmark/shelfmark.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Load a CSV book dataset into the catalog
    ///
    /// Reads the dataset row by row and writes cleaned book records to the
    /// catalog database. For each row:
    ///
    /// - Rejects rows with a missing or malformed ISBN-13 or missing title
    /// - Removes rows whose description is below the word threshold
    /// - Keeps rows with no description at all, flagged for later stages
    /// - Derives book age and the combined title + subtitle form
    ///
    /// The load is idempotent: re-running it updates existing rows in
    /// place rather than duplicating them.
    ///
    /// Output:
    /// - Summary showing rows read, loaded, rejected, and dropped
    ///
    /// Use 'shelfmark status' to view the loaded catalog.
    Load {
        /// Path to the CSV dataset
        dataset: PathBuf,
    },
    /// Classify books as Fiction/Nonfiction
    ///
    /// Uses the built-in category map where the raw dataset category is
    /// known, and the hosted zero-shot model otherwise. Books with no
    /// description and no mapped category are recorded as "unknown".
    Classify,
    /// Score the emotional tone of book descriptions
    Emotions,
    /// Embed descriptions and load them into the vector store
    Index,
    /// Ask for book recommendations in natural language
    Query {
        /// The query text, e.g. "a story about forgiveness"
        query: String,

        /// Keep only books in this category (e.g. Fiction)
        #[arg(long)]
        category: Option<String>,

        /// Re-order results by emotional tone
        /// (happy, surprising, angry, suspenseful, sad)
        #[arg(long)]
        tone: Option<String>,

        /// Number of results to return
        #[arg(long, default_value_t = 16)]
        limit: usize,
    },
    /// Run the full clean → classify → emotions → index pipeline
    Run {
        /// Path to the CSV dataset
        dataset: PathBuf,
    },
    /// Show catalog and pipeline status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the current effective configuration
    Show,
    /// Get a config value, or print the whole config file
    Get {
        /// Config key (openai_api_key, hf_api_token, database_path)
        key: Option<String>,
    },
    /// Set a config value
    Set {
        /// Config key (openai_api_key, hf_api_token, database_path)
        key: String,
        value: String,
    },
    /// Show the config file path
    Path,
    /// Show example configuration
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match cli.db {
        Some(db_path) => Config::load_with_db_path(db_path)?,
        None => Config::load()?,
    };

    // Ensure the database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command {
        Commands::Load { dataset } => {
            commands::run_load(&config, dataset)?;
        }
        Commands::Classify => {
            commands::run_classify(&config).await?;
        }
        Commands::Emotions => {
            commands::run_emotions(&config).await?;
        }
        Commands::Index => {
            commands::run_index(&config).await?;
        }
        Commands::Query {
            query,
            category,
            tone,
            limit,
        } => {
            commands::run_query(&config, &query, category, tone, limit).await?;
        }
        Commands::Run { dataset } => {
            commands::run_pipeline(&config, dataset).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config()?,
            ConfigAction::Get { key } => commands::config::get_config(key)?,
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
