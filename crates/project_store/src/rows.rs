//! Database row types and their mapping onto entities.

use chrono::{DateTime, SecondsFormat, Utc};
use entities::{Project, Task, TaskStatus};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{StoreError, StoreResult};

/// PostgreSQL row for Project
#[derive(Debug, FromRow)]
pub(crate) struct PgProjectRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<PgProjectRow> for Project {
    fn from(row: PgProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL row for Task
#[derive(Debug, FromRow)]
pub(crate) struct PgTaskRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgTaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: PgTaskRow) -> StoreResult<Self> {
        Ok(Task {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
        })
    }
}

/// SQLite row for Project. Ids and timestamps are stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct SqliteProjectRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl TryFrom<SqliteProjectRow> for Project {
    type Error = StoreError;

    fn try_from(row: SqliteProjectRow) -> StoreResult<Self> {
        Ok(Project {
            id: parse_id(&row.id)?,
            name: row.name,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// SQLite row for Task
#[derive(Debug, FromRow)]
pub(crate) struct SqliteTaskRow {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
}

impl TryFrom<SqliteTaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: SqliteTaskRow) -> StoreResult<Self> {
        Ok(Task {
            id: parse_id(&row.id)?,
            project_id: parse_id(&row.project_id)?,
            title: row.title,
            description: row.description,
            status: parse_status(&row.status)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Encodes a timestamp as fixed-width RFC 3339 with microseconds.
///
/// Fixed width keeps lexical order equal to chronological order.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::invalid_data(format!("bad timestamp {s:?}: {e}")))
}

fn parse_id(s: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::invalid_data(format!("bad id {s:?}: {e}")))
}

fn parse_status(s: &str) -> StoreResult<TaskStatus> {
    s.parse()
        .map_err(|e: entities::ParseTaskStatusError| StoreError::invalid_data(e.to_string()))
}
