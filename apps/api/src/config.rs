use std::time::Duration;

use anyhow::{Context, Result};

use crate::matching::combiner::CombinationStrategy;
use crate::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    /// Elasticsearch endpoint. When unset the in-process index is used.
    pub search_url: Option<String>,
    pub search_index: String,
    pub search_username: Option<String>,
    pub search_password: Option<String>,
    pub search_timeout: Duration,
    pub evaluation_timeout: Duration,
    /// Relevance assigned to candidates the search engine does not return.
    pub relevance_floor: f64,
    pub combination_strategy: CombinationStrategy,
    pub retry: RetryPolicy,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let relevance_floor: f64 = parse_env("RELEVANCE_FLOOR", "0.1")?;
        if !(0.0..=1.0).contains(&relevance_floor) {
            anyhow::bail!("RELEVANCE_FLOOR must be within 0.0..=1.0, got {relevance_floor}");
        }

        let strategy_label = optional_env("COMBINATION_STRATEGY")
            .unwrap_or_else(|| "two_factor".to_string());
        let combination_strategy = CombinationStrategy::from_label(&strategy_label)
            .with_context(|| {
                format!("COMBINATION_STRATEGY must be 'two_factor' or 'three_factor', got '{strategy_label}'")
            })?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            search_url: optional_env("SEARCH_URL"),
            search_index: optional_env("SEARCH_INDEX").unwrap_or_else(|| "candidates".to_string()),
            search_username: optional_env("SEARCH_USERNAME"),
            search_password: optional_env("SEARCH_PASSWORD"),
            search_timeout: Duration::from_secs(parse_env("SEARCH_TIMEOUT_SECS", "30")?),
            evaluation_timeout: Duration::from_secs(parse_env("EVALUATION_TIMEOUT_SECS", "60")?),
            relevance_floor,
            combination_strategy,
            retry: RetryPolicy::new(
                parse_env("RETRY_MAX_ATTEMPTS", "3")?,
                Duration::from_millis(parse_env("RETRY_BASE_DELAY_MS", "1000")?),
            ),
            port: parse_env("PORT", "8080")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number"))
}
