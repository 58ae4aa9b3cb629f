//! Classification of a single work item's result.
//!
//! Two catch points exist:
//! - [`catch_test`] wraps a test body. A returned [`TestFailure`] or a panic carrying a string is an ordinary
//!   test failure.
//! - [`catch_escaped`] wraps an arbitrary work item inside the scheduler. Anything that panics out of an item
//!   already escaped its own boundary, so it is an infrastructure failure.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use testrun_core::TestResult;

/// Outcome of running one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// The test body failed: an assertion, a mismatch, a violated precondition.
    TestFailure(String),
    /// The harness could not classify what happened.
    InfrastructureFailure(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// Any non-success outcome.
    pub fn has_error(&self) -> bool {
        !self.is_success()
    }

    /// Failures the harness cannot explain, surfaced separately from test failures.
    pub fn has_unknown_error(&self) -> bool {
        matches!(self, RunOutcome::InfrastructureFailure(_))
    }

    /// Failure text; empty on success.
    pub fn message(&self) -> &str {
        match self {
            RunOutcome::Success => "",
            RunOutcome::TestFailure(msg) | RunOutcome::InfrastructureFailure(msg) => msg,
        }
    }
}

const NON_STRING_PANIC: &str = "A non-standard error has occurred.";

thread_local! {
    static CATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as inside a catch point for as long as it lives.
struct CatchScope;

impl CatchScope {
    fn enter() -> Self {
        CATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        CatchScope
    }
}

impl Drop for CatchScope {
    fn drop(&mut self) {
        CATCH_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Whether a panic raised on this thread right now would be caught by [`catch_test`] or [`catch_escaped`].
pub fn is_inside_catch() -> bool {
    CATCH_DEPTH.with(|depth| depth.get() > 0)
}

/// Extract the text of a panic payload, if it carries one.
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        Some((*msg).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

/// Run a test body, converting every way it can fail into a [`RunOutcome`].
pub fn catch_test<F>(body: F) -> RunOutcome
where
    F: FnOnce() -> TestResult,
{
    let _scope = CatchScope::enter();
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => RunOutcome::Success,
        Ok(Err(failure)) => RunOutcome::TestFailure(failure.to_string()),
        Err(payload) => match panic_message(payload.as_ref()) {
            Some(msg) => RunOutcome::TestFailure(msg),
            None => RunOutcome::InfrastructureFailure(NON_STRING_PANIC.to_string()),
        },
    }
}

/// Run a work item inside the scheduler; a panic that reaches here is always an infrastructure failure.
pub fn catch_escaped<F>(item: F) -> RunOutcome
where
    F: FnOnce() -> RunOutcome,
{
    let _scope = CatchScope::enter();
    match panic::catch_unwind(AssertUnwindSafe(item)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let detail = panic_message(payload.as_ref()).unwrap_or_else(|| NON_STRING_PANIC.to_string());
            RunOutcome::InfrastructureFailure(format!("work item panicked outside its boundary: {detail}"))
        }
    }
}
