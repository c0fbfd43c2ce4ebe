//! PostgreSQL project store implementation.

use std::{future::Future, str::FromStr, time::Duration};

use async_trait::async_trait;
use entities::{Project, Task, TaskStatus};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use uuid::Uuid;

use crate::{
    deadline::{is_foreign_key_violation, is_statement_timeout, with_deadline},
    rows::{PgProjectRow, PgTaskRow},
    ProjectStore, StoreConfig, StoreError, StoreResult, TaskPatch,
};

const INSERT_PROJECT: &str = r#"
    INSERT INTO projects (id, name, created_at)
    VALUES ($1, $2, $3)
    RETURNING id, name, created_at
"#;

const GET_PROJECT: &str = r#"
    SELECT id, name, created_at
    FROM projects
    WHERE id = $1
"#;

const LIST_PROJECTS: &str = r#"
    SELECT id, name, created_at
    FROM projects
    ORDER BY created_at DESC, id DESC
"#;

const INSERT_TASK: &str = r#"
    INSERT INTO tasks (id, project_id, title, description, status, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, project_id, title, description, status, created_at
"#;

const LIST_TASKS: &str = r#"
    SELECT id, project_id, title, description, status, created_at
    FROM tasks
    WHERE project_id = $1
    ORDER BY created_at DESC, id DESC
"#;

// NULL parameters keep the stored value; an empty string overwrites it.
const UPDATE_TASK: &str = r#"
    UPDATE tasks
    SET title = COALESCE($3::text, title),
        description = COALESCE($4::text, description),
        status = COALESCE($5::text, status)
    WHERE project_id = $1 AND id = $2
    RETURNING id, project_id, title, description, status, created_at
"#;

/// Extra client-side wait beyond the operation timeout, so the server's
/// `statement_timeout` fires first and the statement is rolled back.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// PostgreSQL project store (for multi-process deployments)
///
/// Correctness under concurrency is left to the engine: every mutating
/// operation is a single-row statement.
#[derive(Debug, Clone)]
pub struct PostgresProjectStore {
    pool: PgPool,
    operation_timeout: Option<Duration>,
}

impl PostgresProjectStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            operation_timeout: None,
        }
    }

    /// Sets the deadline applied to each operation.
    ///
    /// The server only aborts a statement at this bound if the pool's
    /// connections carry a matching `statement_timeout`, as pools built by
    /// [`connect`](Self::connect) do. Otherwise a write reported as
    /// `Timeout` may still commit.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Connects a pool using `config`.
    ///
    /// At least one connection is opened before returning, so an unreachable
    /// server fails here.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config.require_database_url()?;
        let options = connect_options(url, config.operation_timeout)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL project store"
        );
        Ok(Self::new(pool).with_operation_timeout(config.operation_timeout))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Runs one operation under the configured timeout.
    ///
    /// The server enforces the timeout itself and rolls the statement back;
    /// its cancellation is reported as `Timeout`. The client waits a little
    /// longer and gives up only if the server never answers.
    async fn bounded<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let Some(limit) = self.operation_timeout else {
            return op.await;
        };

        match with_deadline(Some(limit + CANCEL_GRACE), op).await {
            Err(StoreError::Database(e)) if is_statement_timeout(&e) => {
                Err(StoreError::Timeout(limit))
            }
            other => other,
        }
    }

    async fn fetch_project(&self, id: Uuid) -> StoreResult<Project> {
        let row: Option<PgProjectRow> = sqlx::query_as(GET_PROJECT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Project::from).ok_or(StoreError::NotFound(id))
    }

    /// Distinguishes a missing project from a missing task after a statement
    /// matched no rows.
    async fn project_exists_or(&self, project_id: Uuid, otherwise: StoreError) -> StoreError {
        match self.fetch_project(project_id).await {
            Ok(_) => otherwise,
            Err(StoreError::NotFound(_)) => StoreError::ProjectNotFound(project_id),
            Err(e) => e,
        }
    }
}

/// Parses `url` and, when an operation timeout is set, asks the server to
/// cancel any statement that runs longer.
fn connect_options(
    url: &str,
    operation_timeout: Option<Duration>,
) -> StoreResult<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url)?;

    Ok(match operation_timeout {
        // statement_timeout = 0 disables the limit, so round up to 1 ms.
        Some(limit) => {
            let millis = limit.as_millis().max(1);
            options.options([("statement_timeout", millis.to_string())])
        }
        None => options,
    })
}

#[async_trait]
impl ProjectStore for PostgresProjectStore {
    // =========================================================================
    // Project operations
    // =========================================================================

    async fn insert_project(&self, name: &str) -> StoreResult<Project> {
        let project = Project::new(name);

        self.bounded(async {
            let row: PgProjectRow = sqlx::query_as(INSERT_PROJECT)
                .bind(project.id)
                .bind(&project.name)
                .bind(project.created_at)
                .fetch_one(&self.pool)
                .await?;

            tracing::debug!(project_id = %row.id, "Inserted project");
            Ok(Project::from(row))
        })
        .await
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        self.bounded(self.fetch_project(id)).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.bounded(async {
            let rows: Vec<PgProjectRow> = sqlx::query_as(LIST_PROJECTS)
                .fetch_all(&self.pool)
                .await?;

            Ok(rows.into_iter().map(Project::from).collect())
        })
        .await
    }

    // =========================================================================
    // Task operations
    // =========================================================================

    async fn insert_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
    ) -> StoreResult<Task> {
        let task = Task::new(project_id, title, description);

        self.bounded(async {
            let row: PgTaskRow = sqlx::query_as(INSERT_TASK)
                .bind(task.id)
                .bind(task.project_id)
                .bind(&task.title)
                .bind(&task.description)
                .bind(TaskStatus::Todo.as_str())
                .bind(task.created_at)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        StoreError::ProjectNotFound(project_id)
                    } else {
                        StoreError::Database(e)
                    }
                })?;

            tracing::debug!(project_id = %project_id, task_id = %row.id, "Inserted task");
            Task::try_from(row)
        })
        .await
    }

    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        self.bounded(async {
            let rows: Vec<PgTaskRow> = sqlx::query_as(LIST_TASKS)
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;

            if rows.is_empty() {
                self.fetch_project(project_id).await.map_err(|e| match e {
                    StoreError::NotFound(_) => StoreError::ProjectNotFound(project_id),
                    other => other,
                })?;
                return Ok(Vec::new());
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
        self.bounded(async {
            let row: Option<PgTaskRow> = sqlx::query_as(UPDATE_TASK)
                .bind(project_id)
                .bind(task_id)
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
