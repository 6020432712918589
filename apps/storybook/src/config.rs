use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub output_dir: PathBuf,
    pub history_path: PathBuf,
    /// Shared budget for malformed and rejected concepts.
    pub max_attempts: u32,
    pub page_count: usize,
    pub history_limit: usize,
    pub page_delay: Duration,
    pub retry_delay: Duration,
    /// Font files tried before system families when rendering cards.
    pub font_paths: Vec<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: require_env("GOOGLE_API_KEY")?,
            text_model: env_or("TEXT_MODEL", "gemini-2.0-flash"),
            image_model: env_or("IMAGE_MODEL", "gemini-2.5-flash-image"),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "output")),
            history_path: PathBuf::from(env_or("HISTORY_PATH", "history.json")),
            max_attempts: parse_env("MAX_ATTEMPTS", 3)?,
            page_count: parse_env("PAGE_COUNT", 8)?,
            history_limit: parse_env("HISTORY_LIMIT", 5)?,
            page_delay: Duration::from_millis(parse_env("PAGE_DELAY_MS", 2000)?),
            retry_delay: Duration::from_millis(parse_env("RETRY_DELAY_MS", 1000)?),
            font_paths: split_paths(&env_or("FONT_PATHS", "")),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
