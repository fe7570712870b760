use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for shelfmark.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (SHELF_* prefix)
/// 3. Config file (~/.config/shelfmark/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key for the embedding service (required for indexing and
    /// querying).
    ///
    /// Can be set via:
    /// - ENV: SHELF_OPENAI_API_KEY
    /// - Config: openai_api_key = "..."
    pub openai_api_key: Option<String>,

    /// Base URL of the embedding service.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Vector width produced by the embedding model.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// API token for the hosted inference service running the
    /// classification and emotion models. Optional; anonymous requests
    /// are heavily rate-limited.
    ///
    /// Can be set via:
    /// - ENV: SHELF_HF_API_TOKEN
    /// - Config: hf_api_token = "..."
    pub hf_api_token: Option<String>,

    /// Base URL of the hosted inference service.
    #[serde(default = "default_hf_base_url")]
    pub hf_base_url: String,

    /// Zero-shot classification model identifier.
    #[serde(default = "default_zero_shot_model")]
    pub zero_shot_model: String,

    /// Emotion classification model identifier.
    #[serde(default = "default_emotion_model")]
    pub emotion_model: String,

    /// Request pacing for the hosted inference service.
    #[serde(default = "default_hf_requests_per_second")]
    pub hf_requests_per_second: u32,

    /// Base URL of the vector database.
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Vector database collection name.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Rows whose description has fewer words than this are dropped by
    /// the clean stage.
    #[serde(default = "default_min_description_words")]
    pub min_description_words: usize,

    /// Texts per embedding request during indexing.
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    /// Optional TOML file replacing the built-in category map.
    pub category_map_path: Option<PathBuf>,

    /// Path to the SQLite catalog database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: SHELF_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/shelfmark/shelfmark.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            hf_api_token: None,
            hf_base_url: default_hf_base_url(),
            zero_shot_model: default_zero_shot_model(),
            emotion_model: default_emotion_model(),
            hf_requests_per_second: default_hf_requests_per_second(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
            min_description_words: default_min_description_words(),
            embed_batch_size: default_embed_batch_size(),
            category_map_path: None,
            database_path: default_db_path(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/shelfmark/config.toml
    /// Reads environment variables with SHELF_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("shelf");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_zero_shot_model() -> String {
    "facebook/bart-large-mnli".to_string()
}

fn default_emotion_model() -> String {
    "j-hartmann/emotion-english-distilroberta-base".to_string()
}

fn default_hf_requests_per_second() -> u32 {
    2
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "books".to_string()
}

fn default_min_description_words() -> usize {
    25
}

fn default_embed_batch_size() -> usize {
    64
}

/// Get the default database path.
///
/// Returns: ~/.local/share/shelfmark/shelfmark.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfmark")
        .join("shelfmark.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/shelfmark/config.toml
/// - macOS: ~/Library/Application Support/shelfmark/config.toml
/// - Windows: %APPDATA%\shelfmark\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfmark")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Shelfmark Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (SHELF_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# API key for the embedding service
# Required for `shelfmark index` and `shelfmark query`
#
# Can also be set via:
# - Environment: SHELF_OPENAI_API_KEY=sk-...
#openai_api_key = "sk-your-key-here"

# API token for the hosted inference service (classification + emotions)
# Optional; anonymous requests are heavily rate-limited
#
# Can also be set via:
# - Environment: SHELF_HF_API_TOKEN=hf_...
#hf_api_token = "hf_your-token-here"

# Base URL of the vector database
#qdrant_url = "http://localhost:6333"

# Vector database collection name
#collection = "books"

# Rows whose description has fewer words than this are dropped
#min_description_words = 25

# Path to the SQLite catalog database
#
# Can also be set via:
# - CLI: shelfmark --db /custom/path.db load books.csv
# - Environment: SHELF_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/shelfmark.db"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
