//! Project store error types.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during project store operations.
///
/// The three not-found variants are expected outcomes that callers branch on;
/// everything else is a fault.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Project lookup by id missed.
    #[error("Project not found: {0}")]
    NotFound(Uuid),

    /// A task operation referenced a project that does not exist.
    #[error("Project not found for task operation: {0}")]
    ProjectNotFound(Uuid),

    /// The project exists but has no task with this id.
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration script failed.
    #[error("Migration {name} failed: {source}")]
    Migration {
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The operation did not finish before its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored row could not be mapped back to an entity.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant failure, such as a poisoned lock.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true for `NotFound`, `ProjectNotFound` and `TaskNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::ProjectNotFound(_) | Self::TaskNotFound(_)
        )
    }

    /// Returns true if the operation hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

/// Result type for project store operations.
pub type StoreResult<T> = Result<T, StoreError>;
