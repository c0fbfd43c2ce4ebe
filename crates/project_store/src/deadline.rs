//! Per-operation deadlines for the relational stores.

use std::{future::Future, time::Duration};

use crate::{StoreError, StoreResult};

/// Runs `op`, failing with `Timeout` if it is still pending after `limit`.
///
/// On expiry the future is dropped and the client stops waiting. The engine
/// is not told: a statement already sent may still run to completion, and
/// its connection is only reused once sqlx has drained the unread reply.
/// Stores that need the engine to abort at the same bound must also set a
/// server-side limit (see `PostgresProjectStore::connect`).
pub(crate) async fn with_deadline<T, F>(limit: Option<Duration>, op: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| StoreError::Timeout(limit))?,
        None => op.await,
    }
}

/// Returns true if the engine rejected a write because a referenced row is
/// missing.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Returns true if PostgreSQL cancelled the statement because it exceeded
/// `statement_timeout` (SQLSTATE 57014).
pub(crate) fn is_statement_timeout(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("57014"))
}
