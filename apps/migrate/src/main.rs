//! Project store migration binary.

use pm_migrate::{config::Config, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(backend = ?config.store.backend()?, "Applying project store migrations");

    let applied = run(&config).await?;

    tracing::info!(applied, "Schema is up to date");
    Ok(())
}
