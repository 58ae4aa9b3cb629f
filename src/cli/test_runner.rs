//! Test run driver.
//!
//! `run_all_tests` is the one entry point: prepare the registry, wrap each test in a
//! [`TestNamedFunctor`], hand the list to the [`TaskRunner`], then report every failure at once.
//!
//! ## Exit status
//!
//! Failures are communicated through the report, not the exit code: `run_all_tests` returns
//! [`ExitCode::SUCCESS`] even when tests fail. Set [`HarnessConfig::strict_exit`] to get
//! [`ExitCode::FAILURE`] instead.

use std::time::Instant;

use tracing::{info, warn};

use crate::harness::{
    ExecuteOptions, ExecuteReport, HarnessConfig, HarnessError, RunMode, TaskRunner, TestFunction, TestNamedFunctor,
    TestRegistry, TestRunContext,
};

use super::ExitCode;
use super::report::{FailureDetail, RunSummary, TestReporter};

/// Run every registered test and report the result.
pub fn run_all_tests(registry: TestRegistry, config: &HarnessConfig, reporter: &mut dyn TestReporter) -> ExitCode {
    let summary = run_tests_safe(registry, config, reporter);
    reporter.on_run_complete(&summary);

    if config.strict_exit && !summary.is_success() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Run every registered test and return the summary without the final report.
///
/// Harness errors (duplicate registration, worker spawn failure) are passed to
/// [`TestReporter::on_abnormal_exit`] and counted as at least one error.
pub fn run_tests_safe(registry: TestRegistry, config: &HarnessConfig, reporter: &mut dyn TestReporter) -> RunSummary {
    let start_time = Instant::now();
    let context = TestRunContext::new();
    let mut summary = RunSummary::default();

    if let Err(err) = run_prepared(registry, config, &context, reporter, &mut summary) {
        warn!(error = %err, "test run aborted");
        summary.error_count = summary.error_count.max(1);
        summary.has_unknown_error |= err.is_infrastructure();
        reporter.on_abnormal_exit(&err);
    }

    summary.elapsed = start_time.elapsed();
    let stats = context.into_stats();
    summary.slowest = stats.slowest;

    info!(
        tests = summary.test_count,
        completed = stats.completed,
        errors = summary.error_count,
        unknown = summary.has_unknown_error,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "test run finished"
    );

    summary
}

fn run_prepared(
    registry: TestRegistry,
    config: &HarnessConfig,
    context: &TestRunContext,
    reporter: &mut dyn TestReporter,
    summary: &mut RunSummary,
) -> Result<(), HarnessError> {
    let registry = match config.filter.as_deref() {
        Some(keyword) => registry.filtered(keyword),
        None => registry,
    };

    let tests = registry.prepared(config.mode)?;
    summary.test_count = tests.len();

    let functors = to_functors(&tests)?;
    let mode_description = describe_mode(config.mode);
    info!(tests = tests.len(), mode = %mode_description, "starting test run");
    reporter.on_run_start(tests.len(), &mode_description);

    let options = ExecuteOptions::new(config.mode.worker_count()).with_budget(config.thread_budget());
    match TaskRunner::execute(&options, &functors, context) {
        Ok(report) => {
            record_failures(summary, &tests, &report);
            Ok(())
        }
        Err(err) => {
            // Workers that did start ran the whole batch; keep what they found.
            if let Some(partial) = err.partial_report() {
                record_failures(summary, &tests, partial);
            }
            Err(err)
        }
    }
}

fn record_failures(summary: &mut RunSummary, tests: &[TestFunction], report: &ExecuteReport) {
    summary.error_count = report.failures.len();
    summary.has_unknown_error = report.has_unknown_error;
    summary.failures = report
        .sorted_failures()
        .into_iter()
        .map(|failed| FailureDetail {
            name: tests[failed.index].name.clone(),
            kind: failed.kind,
            message: failed.message,
        })
        .collect();
}

fn to_functors(tests: &[TestFunction]) -> Result<Vec<TestNamedFunctor>, HarnessError> {
    let total = tests.len();
    tests
        .iter()
        .enumerate()
        .map(|(index, test)| TestNamedFunctor::new(index, test.name.clone(), test.func, total))
        .collect()
}

fn describe_mode(mode: RunMode) -> String {
    match mode {
        RunMode::Sequential => "sequential".to_string(),
        RunMode::Parallel { max_workers: None } => "parallel (all cores)".to_string(),
        RunMode::Parallel {
            max_workers: Some(workers),
        } => format!("parallel ({workers} workers)"),
    }
}
