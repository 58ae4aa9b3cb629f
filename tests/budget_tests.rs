//! Thread budget shared between a run and the sub-tests its tests start.
//!
//! Each registered test fans out into parallel sub-tests. The number of checks running at the same
//! time must stay within the budget the top-level run draws from.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use testrun::cli::report::{RunSummary, TestReporter};
use testrun::harness::{
    CaseRunner, HarnessConfig, HarnessError, RunMode, TestCase, TestRegistry, ThreadBudget,
};
use testrun::{TestResult, run_tests_safe};

struct NullReporter;

impl TestReporter for NullReporter {
    fn on_abnormal_exit(&mut self, _error: &HarnessError) {}

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Tracks how many checks are running at once.
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    const fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct SleepCase {
    name: String,
}

impl fmt::Display for SleepCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sleep {}", self.name)
    }
}

impl TestCase for SleepCase {
    fn name(&self) -> &str {
        &self.name
    }
}

fn nested_checks(budget: Option<&ThreadBudget>, gauge: &Gauge, owner: &str) -> TestResult {
    let cases: Vec<SleepCase> = (0..8)
        .map(|i| SleepCase {
            name: format!("{owner}/{i}"),
        })
        .collect();

    let mut runner = CaseRunner::new().workers(4);
    if let Some(budget) = budget {
        runner = runner.budget(budget);
    }
    runner.run(&cases, |_| {
        gauge.enter();
        thread::sleep(Duration::from_millis(10));
        gauge.exit();
        Ok(())
    })
}

fn run_four(tests: [fn() -> TestResult; 4], config: &HarnessConfig) -> RunSummary {
    let registry = TestRegistry::new()
        .with("fan_out_a", tests[0])
        .with("fan_out_b", tests[1])
        .with("fan_out_c", tests[2])
        .with("fan_out_d", tests[3]);
    run_tests_safe(registry, config, &mut NullReporter)
}

// =============================================================================
// Explicit budget
// =============================================================================

static SMALL_BUDGET: ThreadBudget = ThreadBudget::new(3);
static SMALL_GAUGE: Gauge = Gauge::new();

fn small_a() -> TestResult {
    nested_checks(Some(&SMALL_BUDGET), &SMALL_GAUGE, "a")
}

fn small_b() -> TestResult {
    nested_checks(Some(&SMALL_BUDGET), &SMALL_GAUGE, "b")
}

fn small_c() -> TestResult {
    nested_checks(Some(&SMALL_BUDGET), &SMALL_GAUGE, "c")
}

fn small_d() -> TestResult {
    nested_checks(Some(&SMALL_BUDGET), &SMALL_GAUGE, "d")
}

#[test]
fn nested_runs_stay_within_an_explicit_budget() {
    let config = HarnessConfig::new()
        .with_mode(RunMode::from_jobs(4))
        .with_budget(&SMALL_BUDGET);

    let summary = run_four([small_a, small_b, small_c, small_d], &config);

    assert!(summary.is_success(), "{:?}", summary.failures);
    assert_eq!(summary.test_count, 4);
    assert!(SMALL_GAUGE.peak() >= 1);
    assert!(SMALL_GAUGE.peak() <= 3, "peak = {}", SMALL_GAUGE.peak());
    assert_eq!(SMALL_BUDGET.available(), 3);
}

// =============================================================================
// Shared budget
// =============================================================================

static SHARED_GAUGE: Gauge = Gauge::new();

fn shared_a() -> TestResult {
    nested_checks(None, &SHARED_GAUGE, "a")
}

fn shared_b() -> TestResult {
    nested_checks(None, &SHARED_GAUGE, "b")
}

fn shared_c() -> TestResult {
    nested_checks(None, &SHARED_GAUGE, "c")
}

fn shared_d() -> TestResult {
    nested_checks(None, &SHARED_GAUGE, "d")
}

#[test]
fn nested_runs_stay_within_the_shared_budget_by_default() {
    let config = HarnessConfig::new().with_mode(RunMode::from_jobs(4));
    let capacity = ThreadBudget::shared().capacity();

    let summary = run_four([shared_a, shared_b, shared_c, shared_d], &config);

    assert!(summary.is_success(), "{:?}", summary.failures);
    assert!(SHARED_GAUGE.peak() >= 1);
    assert!(
        SHARED_GAUGE.peak() <= capacity,
        "peak = {}, capacity = {capacity}",
        SHARED_GAUGE.peak()
    );
    assert_eq!(ThreadBudget::shared().available(), capacity);
}
