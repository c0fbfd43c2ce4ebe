//! Behaviour every `ProjectStore` backend must share.
//!
//! Each check only inspects records it created itself, so the suite also
//! runs against a shared PostgreSQL database.

use std::time::Duration;

use entities::TaskStatus;
use uuid::Uuid;

use crate::{ProjectStore, StoreError, TaskPatch};

/// Generates one `#[tokio::test]` per contract check.
///
/// `$make` is evaluated inside each test and must yield
/// `Option<impl ProjectStore>`; `None` skips the test.
macro_rules! store_contract_tests {
    (@emit $make:expr; $($name:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            async fn $name() {
                let Some(store) = $make else {
                    return;
                };
                $crate::contract::$name(&store).await;
            }
        )+
    };
    ($make:expr) => {
        store_contract_tests!(@emit $make;
            round_trips_inserted_project,
            get_unknown_project_is_not_found,
            lists_projects_newest_first,
            insert_task_requires_project,
            inserted_task_starts_as_todo,
            lists_no_tasks_for_new_project,
            list_tasks_for_unknown_project,
            lists_tasks_newest_first,
            lists_only_own_tasks,
            status_only_update_keeps_text,
            update_can_clear_description,
            update_replaces_every_present_field,
            empty_patch_returns_unchanged,
            update_distinguishes_missing_project_and_task,
            updated_task_is_listed,
        );
    };
}

/// Gap between inserts that must not share a timestamp.
const TICK: Duration = Duration::from_millis(2);

pub(crate) async fn round_trips_inserted_project(store: &dyn ProjectStore) {
    let created = store.insert_project("Alpha").await.unwrap();
    let fetched = store.get_project(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.name, "Alpha");
}

pub(crate) async fn get_unknown_project_is_not_found(store: &dyn ProjectStore) {
    let id = Uuid::new_v4();
    let err = store.get_project(id).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(got) if got == id));
}

pub(crate) async fn lists_projects_newest_first(store: &dyn ProjectStore) {
    let first = store.insert_project("P1").await.unwrap();
    tokio::time::sleep(TICK).await;
    let second = store.insert_project("P2").await.unwrap();

    let listed: Vec<_> = store
        .list_projects()
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.id == first.id || p.id == second.id)
        .collect();

    assert_eq!(listed, vec![second, first]);
}

pub(crate) async fn insert_task_requires_project(store: &dyn ProjectStore) {
    let project_id = Uuid::new_v4();
    let err = store.insert_task(project_id, "T1", "D1").await.unwrap_err();

    assert!(matches!(err, StoreError::ProjectNotFound(got) if got == project_id));
    assert!(matches!(
        store.list_tasks(project_id).await,
        Err(StoreError::ProjectNotFound(_))
    ));
}

pub(crate) async fn inserted_task_starts_as_todo(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let task = store.insert_task(project.id, "T1", "D1").await.unwrap();

    assert_eq!(task.project_id, project.id);
    assert_eq!(task.title, "T1");
    assert_eq!(task.description, "D1");
    assert_eq!(task.status, TaskStatus::Todo);
}

pub(crate) async fn lists_no_tasks_for_new_project(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();

    assert!(store.list_tasks(project.id).await.unwrap().is_empty());
}

pub(crate) async fn list_tasks_for_unknown_project(store: &dyn ProjectStore) {
    let project_id = Uuid::new_v4();
    let err = store.list_tasks(project_id).await.unwrap_err();

    assert!(matches!(err, StoreError::ProjectNotFound(got) if got == project_id));
}

pub(crate) async fn lists_tasks_newest_first(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let t1 = store.insert_task(project.id, "T1", "D1").await.unwrap();
    tokio::time::sleep(TICK).await;
    let t2 = store.insert_task(project.id, "T2", "D2").await.unwrap();

    assert_eq!(store.list_tasks(project.id).await.unwrap(), vec![t2, t1]);
}

pub(crate) async fn lists_only_own_tasks(store: &dyn ProjectStore) {
    let alpha = store.insert_project("Alpha").await.unwrap();
    let beta = store.insert_project("Beta").await.unwrap();
    let alpha_task = store.insert_task(alpha.id, "A1", "").await.unwrap();
    store.insert_task(beta.id, "B1", "").await.unwrap();

    assert_eq!(store.list_tasks(alpha.id).await.unwrap(), vec![alpha_task]);
}

pub(crate) async fn status_only_update_keeps_text(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let task = store.insert_task(project.id, "T1", "D1").await.unwrap();

    let updated = store
        .update_task(
            project.id,
            task.id,
            TaskPatch::new().with_status(TaskStatus::Doing),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "T1");
    assert_eq!(updated.description, "D1");
    assert_eq!(updated.status, TaskStatus::Doing);
    assert_eq!(updated.id, task.id);
    assert_eq!(updated.project_id, task.project_id);
    assert_eq!(updated.created_at, task.created_at);
}

pub(crate) async fn update_can_clear_description(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let task = store.insert_task(project.id, "T1", "desc").await.unwrap();

    let updated = store
        .update_task(project.id, task.id, TaskPatch::new().with_description(""))
        .await
        .unwrap();

    assert_eq!(updated.description, "");
    assert_eq!(updated.title, "T1");
    assert_eq!(updated.status, TaskStatus::Todo);
}

pub(crate) async fn update_replaces_every_present_field(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let task = store.insert_task(project.id, "T1", "D1").await.unwrap();

    let patch = TaskPatch::new()
        .with_title("T1 revised")
        .with_description("D1 revised")
        .with_status(TaskStatus::Done);
    let updated = store.update_task(project.id, task.id, patch).await.unwrap();

    assert_eq!(updated.title, "T1 revised");
    assert_eq!(updated.description, "D1 revised");
    assert_eq!(updated.status, TaskStatus::Done);
}

pub(crate) async fn empty_patch_returns_unchanged(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let task = store.insert_task(project.id, "T1", "D1").await.unwrap();

    let updated = store
        .update_task(project.id, task.id, TaskPatch::new())
        .await
        .unwrap();

    assert_eq!(updated, task);
}

pub(crate) async fn update_distinguishes_missing_project_and_task(store: &dyn ProjectStore) {
    let owner = store.insert_project("Owner").await.unwrap();
    let other = store.insert_project("Other").await.unwrap();
    let task = store.insert_task(owner.id, "T1", "D1").await.unwrap();

    let missing_project = Uuid::new_v4();
    let err = store
        .update_task(missing_project, task.id, TaskPatch::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ProjectNotFound(got) if got == missing_project));

    let missing_task = Uuid::new_v4();
    let err = store
        .update_task(owner.id, missing_task, TaskPatch::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::TaskNotFound(got) if got == missing_task));

    let err = store
        .update_task(
            other.id,
            task.id,
            TaskPatch::new().with_status(TaskStatus::Done),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::TaskNotFound(got) if got == task.id));

    let listed = store.list_tasks(owner.id).await.unwrap();
    assert_eq!(listed, vec![task]);
}

pub(crate) async fn updated_task_is_listed(store: &dyn ProjectStore) {
    let project = store.insert_project("Alpha").await.unwrap();
    let task = store.insert_task(project.id, "T1", "D1").await.unwrap();

    let updated = store
        .update_task(project.id, task.id, TaskPatch::new().with_title("T1b"))
        .await
        .unwrap();

    assert_eq!(store.list_tasks(project.id).await.unwrap(), vec![updated]);
}
