use anyhow::{Context, Result};
use shelfmark_etl::{config, Config};

const VALID_KEYS: &str = "openai_api_key, hf_api_token, database_path";

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!(
        "  openai_api_key: {}",
        mask(config.openai_api_key.as_deref())
    );
    println!("  hf_api_token: {}", mask(config.hf_api_token.as_deref()));
    println!("  embedding_model: {}", config.embedding_model);
    println!("  zero_shot_model: {}", config.zero_shot_model);
    println!("  emotion_model: {}", config.emotion_model);
    println!("  qdrant_url: {}", config.qdrant_url);
    println!("  collection: {}", config.collection);
    println!("  min_description_words: {}", config.min_description_words);
    println!("  database_path: {}", config.database_path.display());

    println!("\nPriority: CLI args > ENV vars (SHELF_*) > Config file > Defaults");

    Ok(())
}

/// Redact credentials for display, keeping a recognizable prefix.
fn mask(value: Option<&str>) -> String {
    match value {
        None => "<not set>".to_string(),
        Some(v) if v.len() <= 8 => "****".to_string(),
        Some(v) => format!("{}****", &v[..6]),
    }
}

/// Get a specific config value.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;

        match key.as_str() {
            "openai_api_key" => {
                println!(
                    "{}",
                    config
                        .openai_api_key
                        .unwrap_or_else(|| String::from("<not set>"))
                );
            }
            "hf_api_token" => {
                println!(
                    "{}",
                    config
                        .hf_api_token
                        .unwrap_or_else(|| String::from("<not set>"))
                );
            }
            "database_path" => {
                println!("{}", config.database_path.display());
            }
            _ => {
                anyhow::bail!("Unknown config key: {key}\n\nValid keys: {VALID_KEYS}");
            }
        }
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{contents}");
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'shelfmark config init' to create it.");
        }
    }

    Ok(())
}

/// Set a config value.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    match key {
        "openai_api_key" | "hf_api_token" | "database_path" => {}
        _ => anyhow::bail!("Unknown config key: {key}\n\nValid keys: {VALID_KEYS}"),
    }

    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = replace_key(&contents, key, value);
    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {key} = {value}");
    println!("  in {}", config_path.display());

    Ok(())
}

/// Replace an uncommented `key = ...` line, or append one.
fn replace_key(contents: &str, key: &str, value: &str) -> String {
    let mut new_lines = Vec::new();
    let mut found = false;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(key) && !trimmed.starts_with('#') {
            new_lines.push(format!("{key} = \"{value}\""));
            found = true;
        } else {
            new_lines.push(line.to_string());
        }
    }

    if !found {
        new_lines.push(format!("\n{key} = \"{value}\""));
    }

    new_lines.join("\n")
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure shelfmark.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
