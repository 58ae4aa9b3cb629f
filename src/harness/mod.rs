//! Task-parallel test execution.
//!
//! ## Modules
//!
//! - `registry` - explicit test registry, duplicate guard, ordering
//! - `named` - work-item wrapper around one named test
//! - `context` - per-run shared state
//! - `task_runner` - pull-based scheduler
//! - `budget` - shared cap on worker threads for nested runs
//! - `cases` - parameterised sub-tests built on the scheduler
//! - `outcome` - classification of a single result
//! - `config` - run mode and harness configuration
//!
//! ## Design
//!
//! A test is a plain `fn() -> TestResult`. The scheduler never sees a test body directly: each one is
//! wrapped in a [`TestNamedFunctor`] that converts returned failures and panics into a [`RunOutcome`].
//! Only failures are kept; every failure carries the index of its test in the prepared list.

pub mod budget;
pub mod cases;
pub mod config;
pub mod context;
pub mod error;
pub mod named;
pub mod outcome;
pub mod registry;
pub mod task_runner;

pub use budget::ThreadBudget;
pub use cases::{CaseRunner, TestCase};
pub use config::{HarnessConfig, RunMode};
pub use context::{ContextStats, TestRunContext};
pub use error::HarnessError;
pub use named::TestNamedFunctor;
pub use outcome::RunOutcome;
pub use registry::{TestFn, TestFunction, TestRegistry};
pub use task_runner::{ExecuteOptions, ExecuteReport, FailedItem, FailureKind, TaskRunner, WorkFn, WorkItem};
