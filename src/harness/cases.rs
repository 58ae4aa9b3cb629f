//! Parameterised sub-tests.
//!
//! A single registered test often generates many cases and runs one check over each of them. The
//! [`CaseRunner`] does that either sequentially (stopping at the first failing case) or through the
//! [`TaskRunner`](super::task_runner::TaskRunner), in which case every failure is collected into one
//! combined [`TestFailure`].

use std::fmt;

use testrun_core::assert::require_positive;
use testrun_core::{TestFailure, TestResult};

use super::budget::ThreadBudget;
use super::outcome::{RunOutcome, catch_test};
use super::task_runner::{ExecuteOptions, TaskRunner, WorkFn, compute_core_count};

const UNKNOWN_SUB_TEST_ERROR: &str = "An unknown error has occurred in at least one sub-test.";

/// One generated input for a check.
///
/// `Display` is used to describe the case when it fails.
pub trait TestCase: fmt::Display + Sync {
    /// Unique name within its batch.
    fn name(&self) -> &str;

    /// Reject malformed cases before the check runs.
    fn validate(&self) -> TestResult {
        Ok(())
    }
}

/// Runs a check over a batch of test cases.
#[derive(Debug, Clone, Copy)]
pub struct CaseRunner<'a> {
    workers: usize,
    budget: Option<&'a ThreadBudget>,
}

impl Default for CaseRunner<'_> {
    fn default() -> Self {
        Self {
            workers: 1,
            budget: Some(ThreadBudget::shared()),
        }
    }
}

impl<'a> CaseRunner<'a> {
    /// A sequential runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// 0 = hardware concurrency, 1 = sequential, n = cap.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Draw threads from `budget` instead of [`ThreadBudget::shared`].
    pub fn budget(mut self, budget: &'a ThreadBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn run<T, F>(&self, cases: &[T], check: F) -> TestResult
    where
        T: TestCase,
        F: Fn(&T) -> TestResult + Sync,
    {
        check_test_names(cases)?;

        if compute_core_count(cases.len(), self.workers) <= 1 {
            return run_sequentially(cases, &check);
        }
        self.run_in_parallel(cases, &check)
    }

    fn run_in_parallel<T, F>(&self, cases: &[T], check: &F) -> TestResult
    where
        T: TestCase,
        F: Fn(&T) -> TestResult + Sync,
    {
        let items: Vec<_> = cases
            .iter()
            .map(|case| WorkFn(move |_: usize, _: &()| run_case(case, check)))
            .collect();

        let mut options = ExecuteOptions::new(self.workers);
        options.budget = self.budget;

        let report = TaskRunner::execute(&options, &items, &()).map_err(|err| TestFailure::new(err.to_string()))?;
        if !report.has_unknown_error && report.failures.is_empty() {
            return Ok(());
        }

        let mut message = String::new();
        if report.has_unknown_error {
            message.push_str(UNKNOWN_SUB_TEST_ERROR);
            message.push('\n');
        }
        for failure in report.sorted_failures() {
            message.push_str(&failure.message);
            message.push('\n');
        }

        Err(TestFailure::new(message.trim_end()))
    }
}

fn run_sequentially<T, F>(cases: &[T], check: &F) -> TestResult
where
    T: TestCase,
    F: Fn(&T) -> TestResult + Sync,
{
    for case in cases {
        match run_case(case, check) {
            RunOutcome::Success => {}
            failed => return Err(TestFailure::new(failed.message())),
        }
    }
    Ok(())
}

/// Validate and check one case, attaching the case description to any failure.
fn run_case<T, F>(case: &T, check: &F) -> RunOutcome
where
    T: TestCase,
    F: Fn(&T) -> TestResult + Sync,
{
    match catch_test(|| case.validate().and_then(|()| check(case))) {
        RunOutcome::Success => RunOutcome::Success,
        RunOutcome::TestFailure(msg) => RunOutcome::TestFailure(
            TestFailure::new(msg)
                .append_details(format_args!("Test details: {case}"))
                .to_string(),
        ),
        RunOutcome::InfrastructureFailure(msg) => {
            RunOutcome::InfrastructureFailure(format!("{msg} Test case details: {case}"))
        }
    }
}

/// A batch must be non-empty and its case names unique.
fn check_test_names<T: TestCase>(cases: &[T]) -> TestResult {
    require_positive(cases.len(), "test cases size")?;

    let mut names: Vec<&str> = cases.iter().map(TestCase::name).collect();
    names.sort_unstable();

    match names.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(TestFailure::new(format!("A duplicate test name is found: {}", pair[0]))),
        None => Ok(()),
    }
}
