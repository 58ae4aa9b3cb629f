#![forbid(unsafe_code)]
//! Task-parallel test harness
//!
//! Tests are plain `fn() -> TestResult` functions collected in a [`TestRegistry`]. The harness wraps
//! each one in a named work item, runs the list on a pull-based thread pool, and reports every
//! failure together once all workers have finished.
//!
//! - [`harness`]: registry, scheduler, thread budget, parameterised sub-tests
//! - [`cli`]: the `testrun` binary, the run driver and the reporters
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Test bodies**: A panic inside a test is caught at the work-item boundary and reported like a returned
//!   failure. It never takes down a worker thread or the run.

pub mod cli;
pub mod harness;

pub use cli::test_runner::{run_all_tests, run_tests_safe};
pub use harness::{CaseRunner, HarnessConfig, RunMode, TaskRunner, TestCase, TestRegistry, ThreadBudget};
pub use testrun_core::{TestFailure, TestResult, assert};
