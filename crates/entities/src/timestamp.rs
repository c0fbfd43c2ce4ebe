//! Creation timestamps.

use chrono::{DateTime, SubsecRound, Utc};

/// Returns the current UTC time truncated to microseconds.
///
/// PostgreSQL and the SQLite text encoding both keep microseconds, so a
/// record returned from an insert compares equal to the same record read
/// back later, whichever backend stored it.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
