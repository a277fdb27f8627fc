//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. API keys are wrapped in `secrecy::SecretString` so they never
//! end up in logs.

pub mod secrets;

use crate::engine::BrokerConfig;
use crate::error::{Error, Result};
use secrets::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub openai_api_key: SecretString,
    pub narakeet_api_key: SecretString,
    pub illustrations_dir: PathBuf,
    pub sounds_dir: PathBuf,
    pub meaning_model: String,
    pub image_model: String,
    pub broker: BrokerConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let defaults = BrokerConfig::default();
        let broker = BrokerConfig {
            queue_capacity: optional_parsed("QUEUE_CAPACITY", defaults.queue_capacity)?,
            restart_cooldown: Duration::from_millis(optional_parsed(
                "RESTART_COOLDOWN_MS",
                defaults.restart_cooldown.as_millis() as u64,
            )?),
            offload_workers: optional_parsed("OFFLOAD_WORKERS", defaults.offload_workers)?,
        };
        if broker.queue_capacity == 0 || broker.offload_workers == 0 {
            return Err(Error::Config(
                "QUEUE_CAPACITY and OFFLOAD_WORKERS must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            openai_api_key: SecretString::from(required_var("OPENAI_API_KEY")?),
            narakeet_api_key: SecretString::from(required_var("NARAKEET_API_KEY")?),
            illustrations_dir: std::env::var("ILLUSTRATIONS_DIR")
                .map_or_else(|_| PathBuf::from("data/illustrations"), PathBuf::from),
            sounds_dir: std::env::var("SOUNDS_DIR")
                .map_or_else(|_| PathBuf::from("data/sounds"), PathBuf::from),
            meaning_model: std::env::var("MEANING_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            image_model: std::env::var("IMAGE_MODEL").unwrap_or_else(|_| "dall-e-3".to_string()),
            broker,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {name}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}
