//! Schema migrations.
//!
//! Store operations never issue DDL. The schema is created once, before a
//! relational store is used, by running these scripts (see the `pm-migrate`
//! binary). Every script is idempotent, so running them again is harmless.

use sqlx::{PgPool, SqlitePool};

use crate::{Backend, PostgresProjectStore, SqliteProjectStore, StoreConfig, StoreError, StoreResult};

/// An embedded SQL script.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// File name, used for ordering and error reporting.
    pub name: &'static str,
    /// One or more SQL statements.
    pub sql: &'static str,
}

/// PostgreSQL scripts in application order.
pub const POSTGRES_MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_create_projects.sql",
        sql: include_str!("../migrations/postgres/0001_create_projects.sql"),
    },
    Migration {
        name: "0002_create_tasks.sql",
        sql: include_str!("../migrations/postgres/0002_create_tasks.sql"),
    },
];

/// SQLite scripts in application order.
pub const SQLITE_MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_create_projects.sql",
        sql: include_str!("../migrations/sqlite/0001_create_projects.sql"),
    },
    Migration {
        name: "0002_create_tasks.sql",
        sql: include_str!("../migrations/sqlite/0002_create_tasks.sql"),
    },
];

/// Returns the non-empty scripts sorted by name.
fn ordered(migrations: &[Migration]) -> Vec<Migration> {
    let mut scripts: Vec<Migration> = migrations
        .iter()
        .filter(|m| !m.sql.trim().is_empty())
        .copied()
        .collect();
    scripts.sort_by_key(|m| m.name);
    scripts
}

/// Applies the PostgreSQL scripts on a single pooled connection.
///
/// Returns the number of scripts executed.
pub async fn apply_postgres(pool: &PgPool) -> StoreResult<usize> {
    let scripts = ordered(POSTGRES_MIGRATIONS);
    let mut conn = pool.acquire().await?;

    for script in &scripts {
        tracing::debug!(migration = script.name, "Applying migration");
        sqlx::raw_sql(script.sql)
            .execute(&mut *conn)
            .await
            .map_err(|source| StoreError::Migration {
                name: script.name,
                source,
            })?;
    }

    Ok(scripts.len())
}

/// Applies the SQLite scripts on a single pooled connection.
///
/// Returns the number of scripts executed.
pub async fn apply_sqlite(pool: &SqlitePool) -> StoreResult<usize> {
    let scripts = ordered(SQLITE_MIGRATIONS);
    let mut conn = pool.acquire().await?;

    for script in &scripts {
        tracing::debug!(migration = script.name, "Applying migration");
        sqlx::raw_sql(script.sql)
            .execute(&mut *conn)
            .await
            .map_err(|source| StoreError::Migration {
                name: script.name,
                source,
            })?;
    }

    Ok(scripts.len())
}

/// Connects to the configured database and applies its scripts.
///
/// The in-memory backend has no schema and is rejected.
pub async fn apply(config: &StoreConfig) -> StoreResult<usize> {
    // DDL is not bounded by the per-operation statement timeout.
    let config = &StoreConfig {
        operation_timeout: None,
        ..config.clone()
    };

    let applied = match config.backend()? {
        Backend::Memory => {
            return Err(StoreError::Config(
                "migrations require DATABASE_URL to name a relational database".to_string(),
            ));
        }
        Backend::Postgres => {
            let store = PostgresProjectStore::connect(config).await?;
            let applied = apply_postgres(store.pool()).await;
            store.close().await;
            applied?
        }
        Backend::Sqlite => {
            let store = SqliteProjectStore::connect(config).await?;
            let applied = apply_sqlite(store.pool()).await;
            store.close().await;
            applied?
        }
    };

    tracing::info!(applied, "Migrations applied");
    Ok(applied)
}
