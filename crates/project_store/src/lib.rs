//! Project and task storage.
//!
//! This crate defines the [`ProjectStore`] contract and three backends: an
//! in-memory store (for tests and single-process use), SQLite, and
//! PostgreSQL (for deployments where several processes share one database).
//! [`open_store`] picks a backend from [`StoreConfig`].

#[cfg(test)]
#[macro_use]
mod contract;

mod config;
mod deadline;
mod error;
mod memory;
pub mod migrations;
mod postgres;
mod rows;
mod sqlite;
mod traits;

pub use config::*;
pub use error::*;
pub use memory::*;
pub use postgres::*;
pub use sqlite::*;
pub use traits::*;
