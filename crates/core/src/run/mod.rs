//! Runs: one collection processed end to end.
//!
//! The [`RunSupervisor`] lists a collection, feeds its items to a pool of
//! workers through a bounded queue, posts progress, enforces the deadline,
//! performs the terminal flush and removes the run folder.

mod config;
mod error;
mod progress;
mod supervisor;
mod task;
mod types;
mod worker;

pub use config::RunConfig;
pub use error::{ItemError, RunError};
pub use supervisor::{RunRequest, RunSupervisor};
pub use task::RunTask;
pub use types::{RunOutcome, RunState, RunStatus, RunSummary};
