//! Store configuration and backend selection.

use std::{env, sync::Arc, time::Duration};

use crate::{
    MemoryProjectStore, PostgresProjectStore, ProjectStore, SqliteProjectStore, StoreError,
    StoreResult,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Storage backend chosen by the database URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Process-local maps. Used when no database URL is configured.
    Memory,
    /// PostgreSQL via a connection pool.
    Postgres,
    /// SQLite via a connection pool.
    Sqlite,
}

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,
    /// Deadline applied to each store operation.
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            operation_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Configuration for the in-memory store.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Loads configuration from environment variables.
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let operation_timeout = lookup("PM_DB_OPERATION_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Self {
            database_url,
            max_connections: lookup("PM_DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(
                lookup("PM_DB_ACQUIRE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            ),
            operation_timeout,
        }
    }

    /// Sets the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the per-operation deadline.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Returns the backend selected by the database URL.
    pub fn backend(&self) -> StoreResult<Backend> {
        let Some(url) = self.database_url.as_deref() else {
            return Ok(Backend::Memory);
        };

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or_default();
            Err(StoreError::Config(format!(
                "unsupported database URL scheme: {scheme:?}"
            )))
        }
    }

    /// Returns the database URL, or a configuration error if none is set.
    pub(crate) fn require_database_url(&self) -> StoreResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| StoreError::Config("DATABASE_URL is required".to_string()))
    }
}

/// Opens the backend selected by `config`.
///
/// Relational backends connect eagerly so a bad URL fails here rather than on
/// the first request. The schema must already exist.
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn ProjectStore>> {
    let store: Arc<dyn ProjectStore> = match config.backend()? {
        Backend::Memory => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryProjectStore::new())
        }
        Backend::Postgres => Arc::new(PostgresProjectStore::connect(config).await?),
        Backend::Sqlite => Arc::new(SqliteProjectStore::connect(config).await?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> StoreConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_select_memory() {
        let config = config_from(&[]);

        assert_eq!(config.backend().unwrap(), Backend::Memory);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.operation_timeout, None);
    }

    #[test]
    fn test_blank_url_selects_memory() {
        let config = config_from(&[("DATABASE_URL", "  ")]);
        assert_eq!(config.backend().unwrap(), Backend::Memory);
    }

    #[test]
    fn test_backend_from_url_scheme() {
        let pg = config_from(&[("DATABASE_URL", "postgres://pm:pm@localhost/pm")]);
        let pg_long = config_from(&[("DATABASE_URL", "postgresql://localhost/pm")]);
        let sqlite = config_from(&[("DATABASE_URL", "sqlite::memory:")]);
        let mysql = config_from(&[("DATABASE_URL", "mysql://localhost/pm")]);

        assert_eq!(pg.backend().unwrap(), Backend::Postgres);
        assert_eq!(pg_long.backend().unwrap(), Backend::Postgres);
        assert_eq!(sqlite.backend().unwrap(), Backend::Sqlite);
        assert!(matches!(mysql.backend(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_pool_settings_from_env() {
        let config = config_from(&[
            ("PM_DB_MAX_CONNECTIONS", "3"),
            ("PM_DB_ACQUIRE_TIMEOUT_SECS", "9"),
            ("PM_DB_OPERATION_TIMEOUT_MS", "250"),
        ]);

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.acquire_timeout, Duration::from_secs(9));
        assert_eq!(config.operation_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("PM_DB_MAX_CONNECTIONS", "0"),
            ("PM_DB_ACQUIRE_TIMEOUT_SECS", "soon"),
            ("PM_DB_OPERATION_TIMEOUT_MS", "0"),
        ]);

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.operation_timeout, None);
    }

    #[test]
    fn test_require_database_url() {
        assert!(matches!(
            StoreConfig::memory().require_database_url(),
            Err(StoreError::Config(_))
        ));
        let config = StoreConfig::memory().with_database_url("sqlite::memory:");
        assert_eq!(config.require_database_url().unwrap(), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::memory()).await.unwrap();
        let project = store.insert_project("Alpha").await.unwrap();
        assert_eq!(store.get_project(project.id).await.unwrap(), project);
    }

    #[tokio::test]
    async fn test_open_sqlite_store() {
        let config = StoreConfig::memory().with_database_url("sqlite::memory:");
        let store = open_store(&config).await.unwrap();
        assert!(matches!(
            store.list_projects().await,
            Err(StoreError::Database(_))
        ));
    }
}
