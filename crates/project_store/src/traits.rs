//! Project store trait definitions.

use async_trait::async_trait;
use entities::{Project, Task, TaskStatus};
use uuid::Uuid;

use crate::StoreResult;

/// Partial update for a task.
///
/// `None` leaves the stored field unchanged. `Some(String::new())` is a real
/// value and clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Applies the present fields to `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

/// Trait for project and task storage operations.
///
/// Every backend returns the same sentinel errors for the same situations,
/// so callers can swap backends without changing how they branch.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    // =========================================================================
    // Project operations
    // =========================================================================

    /// Creates a project with a fresh id and creation time.
    ///
    /// Name validation is the caller's responsibility.
    async fn insert_project(&self, name: &str) -> StoreResult<Project>;

    /// Gets a project by ID, failing with `NotFound` if it does not exist.
    async fn get_project(&self, id: Uuid) -> StoreResult<Project>;

    /// Lists all projects, newest first.
    ///
    /// Equal creation times are ordered by id, descending.
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;

    // =========================================================================
    // Task operations
    // =========================================================================

    /// Creates a `todo` task under an existing project.
    ///
    /// Fails with `ProjectNotFound` if the project does not exist.
    async fn insert_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
    ) -> StoreResult<Task>;

    /// Lists a project's tasks, newest first.
    ///
    /// An existing project without tasks yields an empty list; a missing
    /// project fails with `ProjectNotFound`.
    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Applies `patch` to a task and returns the updated record.
    ///
    /// Fails with `ProjectNotFound` if the project does not exist and with
    /// `TaskNotFound` if the project exists but does not own `task_id`.
    async fn update_task(
        &self,
        project_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Task>;
}
