use std::str::FromStr;

use anyhow::{Context, Result};

use crate::generation::pipeline::DEFAULT_PROMPT_KEYWORDS;
use crate::keywords::extractor::DEFAULT_MAX_TERMS;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// API root of the generation backend; requests go to `{llm_base_url}/generate`.
    pub llm_base_url: String,
    pub llm_model: String,
    /// Overall bound on a backend call, connection and full stream included.
    pub llm_timeout_secs: u64,
    /// Cap on the ranked term list returned by the extractor.
    pub keyword_limit: usize,
    /// How many top-ranked terms are placed in a generation prompt.
    pub prompt_keyword_count: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/api".to_string()),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "cusmodel1.2".to_string()),
            llm_timeout_secs: env_or("LLM_TIMEOUT_SECS", 120)?,
            keyword_limit: env_or("KEYWORD_LIMIT", DEFAULT_MAX_TERMS)?,
            prompt_keyword_count: env_or("PROMPT_KEYWORD_COUNT", DEFAULT_PROMPT_KEYWORDS)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, falling back to `default` when unset.
/// A variable that is set but does not parse is an error, not a silent default.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
