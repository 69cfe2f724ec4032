use std::time::Duration;

use anyhow::{Context, Result};

use crate::ingestion::ReadinessConfig;
use crate::session::autosave::AutosaveConfig;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub producer_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub readiness_poll_interval_secs: u64,
    pub readiness_max_attempts: u32,
    pub autosave_quiet_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            producer_base_url: require_env("PRODUCER_BASE_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            readiness_poll_interval_secs: parse_env("READINESS_POLL_INTERVAL_SECS", 3)?,
            readiness_max_attempts: parse_env("READINESS_MAX_ATTEMPTS", 40)?,
            autosave_quiet_ms: parse_env("AUTOSAVE_QUIET_MS", 1500)?,
        })
    }

    pub fn readiness_config(&self) -> ReadinessConfig {
        ReadinessConfig {
            poll_interval: Duration::from_secs(self.readiness_poll_interval_secs),
            max_attempts: self.readiness_max_attempts,
        }
    }

    pub fn autosave_config(&self) -> AutosaveConfig {
        AutosaveConfig {
            quiet_period: Duration::from_millis(self.autosave_quiet_ms),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
