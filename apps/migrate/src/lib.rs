//! Schema migration tool for the project store.
//!
//! Applies the embedded SQL scripts to the database named by `DATABASE_URL`.
//! Run it once before starting anything that opens a relational store.

pub mod config;

use std::time::Duration;

use project_store::migrations;

use crate::config::Config;

/// Upper bound on the whole migration run.
pub const MIGRATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Applies all migrations and returns the number of scripts executed.
pub async fn run(config: &Config) -> anyhow::Result<usize> {
    run_with_timeout(config, MIGRATION_TIMEOUT).await
}

async fn run_with_timeout(config: &Config, limit: Duration) -> anyhow::Result<usize> {
    let applied = tokio::time::timeout(limit, migrations::apply(&config.store))
        .await
        .map_err(|_| anyhow::anyhow!("migrations did not finish within {:?}", limit))??;

    Ok(applied)
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
