//! Harness-level errors.
//!
//! These are failures of the harness itself (bad registration, broken scheduling), never of a test body.
//! Test failures travel as [`RunOutcome`](super::outcome::RunOutcome) values instead.

use miette::Diagnostic;
use thiserror::Error;

use super::task_runner::ExecuteReport;

/// Errors that abort a whole run.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("FunctionPointers are repeating at index {index}, name '{name}'.")]
    #[diagnostic(
        code(testrun::duplicate_test),
        help("each test function must be registered exactly once")
    )]
    DuplicateTest { index: usize, name: String },

    #[error("the test at index {index} has an empty name")]
    #[diagnostic(code(testrun::empty_name))]
    EmptyName { index: usize },

    #[error("the total test count must be positive, got {total}")]
    #[diagnostic(code(testrun::invalid_total))]
    InvalidTotal { total: usize },

    #[error("failed to start worker thread {spawned} of {requested}: {source}")]
    #[diagnostic(
        code(testrun::worker_spawn),
        help("re-run with --sequential, or lower --jobs")
    )]
    WorkerSpawn {
        spawned: usize,
        requested: usize,
        #[source]
        source: std::io::Error,
        /// What the workers that did start (or the caller) collected before the error was returned.
        partial: Box<ExecuteReport>,
    },
}

impl HarnessError {
    /// Whether this error came from the scheduling machinery rather than from registration.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, HarnessError::WorkerSpawn { .. })
    }

    /// The report of a batch that ran to completion despite this error.
    pub fn partial_report(&self) -> Option<&ExecuteReport> {
        match self {
            HarnessError::WorkerSpawn { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }
}
