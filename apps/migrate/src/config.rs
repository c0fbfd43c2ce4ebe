//! Migration tool configuration.

use std::env;

use project_store::{Backend, StoreConfig};

/// Configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection settings.
    pub store: StoreConfig,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let store = StoreConfig::from_lookup(&lookup);

        if store.backend()? == Backend::Memory {
            anyhow::bail!("DATABASE_URL is required to run migrations");
        }

        Ok(Self {
            store,
            log_level: lookup("PM_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}
