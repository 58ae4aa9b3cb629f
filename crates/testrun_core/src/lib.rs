//! Provide the failure type and assertion helpers that test bodies use to report problems to the harness.
//!
//! This crate is intentionally small and dependency-light. It is shared by:
//! - the harness (`testrun`), which converts a returned [`TestFailure`] into a result record, and
//! - test bodies, which build those failures with the `require_*` / `are_equal` helpers.
//!
//! ## Notes
//!
//! - No IO and no global state: every helper is a pure check that returns a [`TestResult`].
//! - Failure text is canonical (`The (1) must be equal to (2).`) so reports stay stable across runs.

pub mod assert;
pub mod errors;

pub use errors::{TestFailure, TestResult};
