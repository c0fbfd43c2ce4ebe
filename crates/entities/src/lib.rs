//! Core entity definitions for the project store.
//!
//! Projects own tasks. Both records are plain values: stores hand out clones
//! and keep the canonical copies to themselves.

mod project;
mod task;
mod timestamp;

pub use project::*;
pub use task::*;
pub use timestamp::*;
