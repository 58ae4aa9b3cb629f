//! Work-item wrapper around one named test.

use std::time::Instant;

use tracing::debug;

use super::context::TestRunContext;
use super::error::HarnessError;
use super::outcome::{RunOutcome, catch_test};
use super::registry::TestFn;
use super::task_runner::WorkItem;

/// One test, ready to be handed to a worker.
///
/// Invoking it runs the test exactly once; failures and panics come back as a [`RunOutcome`] and never
/// propagate further.
#[derive(Debug, Clone)]
pub struct TestNamedFunctor {
    name: String,
    func: TestFn,
    total: usize,
}

impl TestNamedFunctor {
    /// Wrap the test at `index` of a prepared list of `total` tests.
    pub fn new(index: usize, name: impl Into<String>, func: TestFn, total: usize) -> Result<Self, HarnessError> {
        let name = name.into();
        if name.is_empty() {
            return Err(HarnessError::EmptyName { index });
        }
        if total == 0 {
            return Err(HarnessError::InvalidTotal { total });
        }
        Ok(Self { name, func, total })
    }

    /// Run the wrapped test once, recording progress in `context`.
    pub fn invoke(&self, index: usize, context: &TestRunContext) -> RunOutcome {
        context.record_start(&self.name);

        let start = Instant::now();
        let outcome = catch_test(self.func);
        let elapsed = start.elapsed();

        let done = context.record_finish(&self.name, elapsed, outcome.has_error());
        debug!(
            test = %self.name,
            index,
            done,
            total = self.total,
            elapsed_us = elapsed.as_micros() as u64,
            passed = outcome.is_success(),
            "test finished"
        );

        outcome
    }
}

impl WorkItem<TestRunContext> for TestNamedFunctor {
    fn run(&self, index: usize, context: &TestRunContext) -> RunOutcome {
        self.invoke(index, context)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use testrun_core::{TestFailure, TestResult};

    fn passes() -> TestResult {
        Ok(())
    }

    fn fails() -> TestResult {
        Err(TestFailure::new("bad input"))
    }

    fn panics() -> TestResult {
        let data: Vec<u32> = Vec::new();
        if data.is_empty() {
            panic!("index out of range");
        }
        Ok(())
    }

    #[test]
    fn test_invoke_records_progress() {
        let context = TestRunContext::new();
        let ok = TestNamedFunctor::new(0, "ok", passes, 2).unwrap();
        let bad = TestNamedFunctor::new(1, "bad", fails, 2).unwrap();

        assert_eq!(ok.invoke(0, &context), RunOutcome::Success);
        assert_eq!(bad.invoke(1, &context), RunOutcome::TestFailure("bad input".to_string()));

        let stats = context.into_stats();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.execution_log, vec!["ok", "bad"]);
    }

    #[test]
    fn test_panic_does_not_escape() {
        let context = TestRunContext::new();
        let functor = TestNamedFunctor::new(0, "panics", panics, 1).unwrap();

        let outcome = functor.invoke(0, &context);
        assert_eq!(outcome.message(), "index out of range");
        assert_eq!(context.into_stats().failed, 1);
    }

    #[test]
    fn test_constructor_validates_inputs() {
        assert!(matches!(
            TestNamedFunctor::new(3, "", passes, 4),
            Err(HarnessError::EmptyName { index: 3 })
        ));
        assert!(matches!(
            TestNamedFunctor::new(0, "t", passes, 0),
            Err(HarnessError::InvalidTotal { total: 0 })
        ));
    }
}
