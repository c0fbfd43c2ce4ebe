//! SQLite project store implementation.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use entities::{Project, Task, TaskStatus};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

use crate::{
    deadline::{is_foreign_key_violation, with_deadline},
    rows::{encode_timestamp, SqliteProjectRow, SqliteTaskRow},
    ProjectStore, StoreConfig, StoreError, StoreResult, TaskPatch,
};

const INSERT_PROJECT: &str = r#"
    INSERT INTO projects (id, name, created_at)
    VALUES (?1, ?2, ?3)
    RETURNING id, name, created_at
"#;

const GET_PROJECT: &str = r#"
    SELECT id, name, created_at
    FROM projects
    WHERE id = ?1
"#;

const LIST_PROJECTS: &str = r#"
    SELECT id, name, created_at
    FROM projects
    ORDER BY created_at DESC, id DESC
"#;

const INSERT_TASK: &str = r#"
    INSERT INTO tasks (id, project_id, title, description, status, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    RETURNING id, project_id, title, description, status, created_at
"#;

const LIST_TASKS: &str = r#"
    SELECT id, project_id, title, description, status, created_at
    FROM tasks
    WHERE project_id = ?1
    ORDER BY created_at DESC, id DESC
"#;

// NULL parameters keep the stored value; an empty string overwrites it.
const UPDATE_TASK: &str = r#"
    UPDATE tasks
    SET title = COALESCE(?3, title),
        description = COALESCE(?4, description),
        status = COALESCE(?5, status)
    WHERE project_id = ?1 AND id = ?2
    RETURNING id, project_id, title, description, status, created_at
"#;

/// SQLite project store (for single-process deployments)
///
/// Ids are stored as hyphenated text and timestamps as fixed-width RFC 3339
/// text, so `ORDER BY created_at DESC, id DESC` yields the same order as the
/// other backends.
#[derive(Debug, Clone)]
pub struct SqliteProjectStore {
    pool: SqlitePool,
    operation_timeout: Option<Duration>,
}

impl SqliteProjectStore {
    /// Creates a store over an existing pool.
    ///
    /// The pool's connections must have foreign keys enabled.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            operation_timeout: None,
        }
    }

    /// Sets the deadline applied to each operation.
    ///
    /// SQLite has no server to cancel: a statement already handed to the
    /// connection's worker thread still runs, so a write reported as
    /// `Timeout` may have been applied.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Connects a pool using `config`, creating the database file if needed.
    ///
    /// An in-memory URL gets a single long-lived connection, since every
    /// SQLite connection to `:memory:` opens a separate database.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config.require_database_url()?;
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        tracing::info!(in_memory, "Connected to SQLite project store");
        Ok(Self::new(pool).with_operation_timeout(config.operation_timeout))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_project(&self, id: Uuid) -> StoreResult<Project> {
        let row: Option<SqliteProjectRow> = sqlx::query_as(GET_PROJECT)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Project::try_from(row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn project_exists_or(&self, project_id: Uuid, otherwise: StoreError) -> StoreError {
        match self.fetch_project(project_id).await {
            Ok(_) => otherwise,
            Err(StoreError::NotFound(_)) => StoreError::ProjectNotFound(project_id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn insert_project(&self, name: &str) -> StoreResult<Project> {
        let project = Project::new(name);

        with_deadline(self.operation_timeout, async {
            let row: SqliteProjectRow = sqlx::query_as(INSERT_PROJECT)
                .bind(project.id.to_string())
                .bind(&project.name)
                .bind(encode_timestamp(&project.created_at))
                .fetch_one(&self.pool)
                .await?;

            tracing::debug!(project_id = %project.id, "Inserted project");
            Project::try_from(row)
        })
        .await
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        with_deadline(self.operation_timeout, self.fetch_project(id)).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        with_deadline(self.operation_timeout, async {
            let rows: Vec<SqliteProjectRow> = sqlx::query_as(LIST_PROJECTS)
                .fetch_all(&self.pool)
                .await?;

            rows.into_iter().map(Project::try_from).collect()
        })
        .await
    }

    async fn insert_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
    ) -> StoreResult<Task> {
        let task = Task::new(project_id, title, description);

        with_deadline(self.operation_timeout, async {
            let row: SqliteTaskRow = sqlx::query_as(INSERT_TASK)
                .bind(task.id.to_string())
                .bind(project_id.to_string())
                .bind(&task.title)
                .bind(&task.description)
                .bind(TaskStatus::Todo.as_str())
                .bind(encode_timestamp(&task.created_at))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        StoreError::ProjectNotFound(project_id)
                    } else {
                        StoreError::Database(e)
                    }
                })?;

            tracing::debug!(project_id = %project_id, task_id = %task.id, "Inserted task");
            Task::try_from(row)
        })
        .await
    }

    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        with_deadline(self.operation_timeout, async {
            let rows: Vec<SqliteTaskRow> = sqlx::query_as(LIST_TASKS)
                .bind(project_id.to_string())
                .fetch_all(&self.pool)
                .await?;

            if rows.is_empty() {
                return match self.fetch_project(project_id).await {
                    Ok(_) => Ok(Vec::new()),
                    Err(StoreError::NotFound(_)) => Err(StoreError::ProjectNotFound(project_id)),
                    Err(e) => Err(e),
                };
            }

            rows.into_iter().map(Task::try_from).collect()
        })
        .await
    }

    async fn update_task(
        &self,
        project_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Task> {
        with_deadline(self.operation_timeout, async {
            let row: Option<SqliteTaskRow> = sqlx::query_as(UPDATE_TASK)
                .bind(project_id.to_string())
                .bind(task_id.to_string())
                .bind(patch.title.as_deref())
                .bind(patch.description.as_deref())
                .bind(patch.status.map(|s| s.as_str()))
                .fetch_optional(&self.pool)
                .await?;

            match row {
                Some(row) => {
                    tracing::debug!(project_id = %project_id, task_id = %task_id, "Updated task");
                    Task::try_from(row)
                }
                None => Err(self
                    .project_exists_or(project_id, StoreError::TaskNotFound(task_id))
                    .await),
            }
        })
        .await
    }
}
