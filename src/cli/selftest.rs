//! Built-in suite run by the `testrun` binary.
//!
//! Each test drives one piece of the harness through its public API, so running the binary checks
//! the scheduler with the scheduler.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use testrun_core::assert::{are_equal, require_equal, require_less_equal, require_true, require_unique};
use testrun_core::{TestFailure, TestResult};

use crate::harness::outcome::catch_test;
use crate::harness::registry::find_first_repetition;
use crate::harness::task_runner::compute_core_count;
use crate::harness::{
    CaseRunner, ExecuteOptions, HarnessError, RunMode, RunOutcome, TaskRunner, TestCase, TestRegistry, TestRunContext,
    ThreadBudget, WorkFn,
};

/// The registry of built-in tests.
pub fn registry() -> TestRegistry {
    TestRegistry::new()
        .with("budget_permits_are_returned", budget_permits_are_returned)
        .with("cases_collect_every_failure", cases_collect_every_failure)
        .with("context_counts_concurrent_updates", context_counts_concurrent_updates)
        .with("core_count_is_bounded", core_count_is_bounded)
        .with("duplicate_registration_is_detected", duplicate_registration_is_detected)
        .with("find_first_repetition_finds_later_index", find_first_repetition_finds_later_index)
        .with("outcome_classifies_panics", outcome_classifies_panics)
        .with("run_mode_maps_jobs", run_mode_maps_jobs)
        .with("scheduler_balances_skewed_items", scheduler_balances_skewed_items)
        .with("scheduler_keeps_failure_indexes", scheduler_keeps_failure_indexes)
        .with("sequential_order_is_reproducible", sequential_order_is_reproducible)
}

fn budget_permits_are_returned() -> TestResult {
    let budget = ThreadBudget::new(3);
    {
        let permits = budget.acquire_up_to(10);
        require_equal(&permits.len(), "permits granted", &3)?;
        require_true(budget.try_acquire().is_none(), "exhausted budget grants nothing")?;
    }
    require_equal(&budget.available(), "permits after drop", &3)
}

struct DoublingCase {
    name: String,
    value: u64,
    expected: u64,
}

impl fmt::Display for DoublingCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: 2 * {} = {}", self.name, self.value, self.expected)
    }
}

impl TestCase for DoublingCase {
    fn name(&self) -> &str {
        &self.name
    }
}

fn cases_collect_every_failure() -> TestResult {
    let cases: Vec<DoublingCase> = (0..16)
        .map(|value| DoublingCase {
            name: format!("double {value}"),
            value,
            expected: if value % 4 == 3 { value } else { value * 2 },
        })
        .collect();

    let budget = ThreadBudget::new(4);
    let result = CaseRunner::new()
        .workers(4)
        .budget(&budget)
        .run(&cases, |case| require_equal(&(case.value * 2), "doubled", &case.expected));

    let Err(failure) = result else {
        return Err(TestFailure::new("broken cases were not reported"));
    };
    let details = failure
        .message()
        .lines()
        .filter(|line| line.starts_with("Test details:"))
        .count();
    require_equal(&details, "failing cases", &4)?;
    require_equal(&budget.available(), "budget after run", &4)
}

fn context_counts_concurrent_updates() -> TestResult {
    let context = TestRunContext::new();

    thread::scope(|scope| {
        for worker in 0..4 {
            let context = &context;
            scope.spawn(move || {
                for i in 0..50_u64 {
                    let name = format!("{worker}/{i}");
                    context.record_start(&name);
                    context.record_finish(&name, Duration::from_nanos(i), i % 2 == 0);
                }
            });
        }
    });

    let stats = context.into_stats();
    require_equal(&stats.completed, "completed", &200)?;
    require_equal(&stats.failed, "failed", &100)?;
    require_unique(&stats.execution_log, "execution log")
}

fn core_count_is_bounded() -> TestResult {
    require_equal(&compute_core_count(2, 16), "capped by items", &2)?;
    require_equal(&compute_core_count(0, 16), "at least one", &1)?;
    require_equal(&compute_core_count(100, 5), "capped by request", &5)
}

fn registered_once() -> TestResult {
    Ok(())
}

fn duplicate_registration_is_detected() -> TestResult {
    let registry = TestRegistry::new()
        .with("first", registered_once)
        .with("second", registered_once);

    match registry.prepared(RunMode::parallel()) {
        Err(HarnessError::DuplicateTest { index, name }) => {
            require_equal(&index, "duplicate index", &1)?;
            require_equal(&name.as_str(), "duplicate name", &"second")
        }
        Err(other) => Err(TestFailure::new(format!("unexpected error: {other}"))),
        Ok(_) => Err(TestFailure::new("duplicate function pointers were accepted")),
    }
}

fn find_first_repetition_finds_later_index() -> TestResult {
    are_equal(&find_first_repetition(&["a", "b", "c", "b", "a"]), &Some(3), "repeat")?;
    are_equal(&find_first_repetition(&[7, 8, 9]), &None, "no repeat")
}

fn outcome_classifies_panics() -> TestResult {
    let failed = catch_test(|| Err(TestFailure::new("returned")));
    are_equal(&failed, &RunOutcome::TestFailure("returned".to_string()), "returned failure")?;

    let panicked = catch_test(|| panic!("assertion in body"));
    require_true(!panicked.has_unknown_error(), "string panic is a test failure")?;

    let unknown = catch_test(|| std::panic::panic_any(Duration::ZERO));
    require_true(unknown.has_unknown_error(), "opaque panic is unknown")
}

fn run_mode_maps_jobs() -> TestResult {
    are_equal(&RunMode::from_jobs(1), &RunMode::Sequential, "jobs = 1")?;
    require_equal(&RunMode::from_jobs(0).worker_count(), "jobs = 0", &0)?;
    require_equal(&RunMode::from_debugger_attached(true).worker_count(), "debugger", &1)
}

fn scheduler_balances_skewed_items() -> TestResult {
    const LONG: Duration = Duration::from_millis(120);
    const SHORT: Duration = Duration::from_millis(5);

    let items: Vec<_> = (0..24)
        .map(|_| {
            WorkFn(|index: usize, done: &AtomicUsize| {
                thread::sleep(if index == 0 { LONG } else { SHORT });
                done.fetch_add(1, Ordering::SeqCst);
                RunOutcome::Success
            })
        })
        .collect();

    let done = AtomicUsize::new(0);
    let start = Instant::now();
    TaskRunner::execute(&ExecuteOptions::new(4), &items, &done).map_err(|e| TestFailure::new(e.to_string()))?;
    let elapsed = start.elapsed();

    require_equal(&done.load(Ordering::SeqCst), "items executed", &24)?;
    // Pull-based workers finish close to the single long item.
    require_less_equal(elapsed.as_millis(), (LONG * 3).as_millis(), "elapsed ms")?;
    Ok(())
}

fn scheduler_keeps_failure_indexes() -> TestResult {
    let messages = ["", "bad input", "", "timeout"];
    let items: Vec<_> = (0..messages.len())
        .map(|_| {
            WorkFn(|index: usize, messages: &[&str; 4]| match messages[index] {
                "" => RunOutcome::Success,
                msg => RunOutcome::TestFailure(msg.to_string()),
            })
        })
        .collect();

    let report =
        TaskRunner::execute(&ExecuteOptions::new(2), &items, &messages).map_err(|e| TestFailure::new(e.to_string()))?;

    let failures: Vec<(usize, String)> = report
        .sorted_failures()
        .into_iter()
        .map(|f| (f.index, f.message))
        .collect();
    are_equal(
        &failures,
        &vec![(1, "bad input".to_string()), (3, "timeout".to_string())],
        "failures",
    )?;
    require_true(!report.has_unknown_error, "ordinary failures are not unknown errors")
}

fn sequential_order_is_reproducible() -> TestResult {
    let run_once = || -> Result<Vec<usize>, TestFailure> {
        let log = Mutex::new(Vec::new());
        let items: Vec<_> = (0..12)
            .map(|_| {
                WorkFn(|index: usize, log: &Mutex<Vec<usize>>| {
                    if let Ok(mut log) = log.lock() {
                        log.push(index);
                    }
                    RunOutcome::Success
                })
            })
            .collect();
        TaskRunner::execute(&ExecuteOptions::sequential(), &items, &log)
            .map_err(|e| TestFailure::new(e.to_string()))?;
        log.into_inner().map_err(|_| TestFailure::new("log poisoned"))
    };

    let first = run_once()?;
    let second = run_once()?;
    are_equal(&first, &second, "two sequential runs")?;
    are_equal(&first, &(0..12).collect::<Vec<_>>(), "input order")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::harness::HarnessConfig;

    #[test]
    fn test_selftest_suite_passes() {
        let tests = registry().prepared(RunMode::parallel()).unwrap();
        for test in tests {
            assert_eq!((test.func)(), Ok(()), "{} failed", test.name);
        }
    }

    #[test]
    fn test_selftest_registry_has_unique_functions() {
        let config = HarnessConfig::default();
        assert!(registry().prepared(config.mode).is_ok());
    }
}
