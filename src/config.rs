use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use reqwest::Url;

/// Environment variable that overrides the API base URL.
pub const API_URL_ENV: &str = "SONGS_API_URL";
/// Base URL used when the environment does not provide one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".favorite-songs";
const LOG_FILE_NAME: &str = "favorite-songs.log";

/// Runtime settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub log_path: PathBuf,
}

impl Config {
    /// Read the API URL override from the environment and locate the log file
    /// under the user's home directory.
    pub fn from_env() -> Result<Self> {
        let api_url = resolve_api_url(env::var(API_URL_ENV).ok())
            .with_context(|| format!("invalid {API_URL_ENV}"))?;
        Ok(Self {
            api_url,
            log_path: log_path()?,
        })
    }
}

/// Normalize an optional override into a usable base URL. Blank values fall
/// back to the default; anything else must be an absolute http(s) URL.
pub fn resolve_api_url(raw: Option<String>) -> Result<String> {
    let value = match raw.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_API_URL,
    };

    let parsed = Url::parse(value).with_context(|| format!("'{value}' is not a URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("'{value}' must use http or https"));
    }

    Ok(value.trim_end_matches('/').to_string())
}

fn log_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(LOG_FILE_NAME))
}
