use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, TickerError};

pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
pub const CONFIG_PATH_VAR: &str = "TICKERDB_CONFIG";
pub const OUTPUT_DIR_VAR: &str = "TICKERDB_OUTPUT_DIR";
pub const DEFAULT_CONFIG_PATH: &str = "tickerdb.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: Api,
    pub output: Output,
    pub filter: Filter,
    pub validation: Validation,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Api {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: String::from("https://www.alphavantage.co/query"),
            user_agent: String::from("Stock-Symbol-Fetcher/1.0"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Output {
    pub dir: PathBuf,
    pub sort_symbols: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            sort_symbols: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Filter {
    // empty keeps every asset type
    pub asset_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Validation {
    pub expected_symbols: Vec<String>,
}

impl Default for Validation {
    fn default() -> Self {
        let expected = ["VZ", "T", "KO", "PFE", "JNJ", "WMT", "AAPL", "MSFT", "GOOGL", "TSLA"];
        Self {
            expected_symbols: expected.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// a missing file means defaults; a broken one is an error
pub fn load_toml(file: &Path) -> Result<Config> {
    let contents = match fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(e.into()),
    };

    toml::from_str(&contents)
        .map_err(|e| TickerError::Config(format!("{}: {}", file.display(), e)))
}

/// Loads `tickerdb.toml` (or `$TICKERDB_CONFIG`) and applies environment overrides.
pub fn load_from_env() -> Result<Config> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| String::from(DEFAULT_CONFIG_PATH));
    let mut config = load_toml(Path::new(&path))?;

    if let Ok(dir) = std::env::var(OUTPUT_DIR_VAR) {
        if !dir.trim().is_empty() {
            config.output.dir = PathBuf::from(dir);
        }
    }
    Ok(config)
}

pub fn api_key_from_env() -> Result<String> {
    api_key_from(std::env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_owned()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(TickerError::Auth(format!("{API_KEY_VAR} is not set"))),
    }
}
