//! In-memory project store implementation.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Project, Task};
use uuid::Uuid;

use crate::{ProjectStore, StoreError, StoreResult, TaskPatch};

/// Records guarded together so a project check and a task write are atomic.
#[derive(Debug, Default)]
struct MemoryState {
    projects: HashMap<Uuid, Project>,
    /// Project id -> task id -> task.
    tasks: HashMap<Uuid, HashMap<Uuid, Task>>,
}

/// In-memory project store.
///
/// A single reader-writer lock covers both maps. Reads hold it only while
/// cloning records out; sorting happens after the guard is dropped.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    state: RwLock<MemoryState>,
}

impl MemoryProjectStore {
    /// Creates a new in-memory project store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))
    }
}

/// Sorts newest first, breaking timestamp ties by descending id.
///
/// The byte order of a `Uuid` is the order of its hyphenated string form, so
/// comparing ids directly matches a comparison of their canonical strings.
pub(crate) fn sort_newest_first<T>(records: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) {
    records.sort_unstable_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    // =========================================================================
    // Project operations
    // =========================================================================

    async fn insert_project(&self, name: &str) -> StoreResult<Project> {
        let project = Project::new(name);

        let mut state = self.write()?;
        state.projects.insert(project.id, project.clone());
        drop(state);

        tracing::debug!(project_id = %project.id, "Inserted project");
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        let state = self.read()?;
        state
            .projects
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = {
            let state = self.read()?;
            state.projects.values().cloned().collect()
        };

        sort_newest_first(&mut projects, |p| (p.created_at, p.id));
        Ok(projects)
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
        let mut state = self.write()?;
        if !state.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound(project_id));
        }

        let task = Task::new(project_id, title, description);
        state
            .tasks
            .entry(project_id)
            .or_default()
            .insert(task.id, task.clone());
        drop(state);

        tracing::debug!(project_id = %project_id, task_id = %task.id, "Inserted task");
        Ok(task)
    }

    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = {
            let state = self.read()?;
            if !state.projects.contains_key(&project_id) {
                return Err(StoreError::ProjectNotFound(project_id));
            }
            state
                .tasks
                .get(&project_id)
                .map(|tasks| tasks.values().cloned().collect())
                .unwrap_or_default()
        };

        sort_newest_first(&mut tasks, |t| (t.created_at, t.id));
        Ok(tasks)
    }

    async fn update_task(
        &self,
        project_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Task> {
        let mut state = self.write()?;
        if !state.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound(project_id));
        }

        let task = state
            .tasks
            .get_mut(&project_id)
            .and_then(|tasks| tasks.get_mut(&task_id))
            .ok_or(StoreError::TaskNotFound(task_id))?;
        patch.apply_to(task);
        let updated = task.clone();
        drop(state);

        tracing::debug!(project_id = %project_id, task_id = %task_id, "Updated task");
        Ok(updated)
    }
}
