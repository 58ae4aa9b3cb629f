//! Property-based tests for the scheduler
//!
//! These tests use proptest to check the scheduler's accounting across random batch sizes, worker
//! counts and failure patterns.

use proptest::prelude::*;
use testrun::harness::registry::find_first_repetition;
use testrun::harness::task_runner::compute_core_count;
use testrun::harness::{ExecuteOptions, FailureKind, RunOutcome, TaskRunner, ThreadBudget, WorkFn};

fn outcome_for(index: usize, pattern: &[bool]) -> RunOutcome {
    if pattern[index] {
        RunOutcome::TestFailure(format!("item {index} failed"))
    } else {
        RunOutcome::Success
    }
}

// =============================================================================
// Scheduler Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: exactly the failing items are reported, each with its own index
    #[test]
    fn failures_match_the_failure_pattern(
        pattern in prop::collection::vec(any::<bool>(), 0..150),
        workers in 0usize..12,
    ) {
        let items: Vec<_> = (0..pattern.len()).map(|_| WorkFn(outcome_for)).collect();

        let report = TaskRunner::execute(&ExecuteOptions::new(workers), &items, &pattern[..]).unwrap();

        let failed: Vec<usize> = report.sorted_failures().iter().map(|f| f.index).collect();
        let expected: Vec<usize> = pattern.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i).collect();
        prop_assert_eq!(failed, expected);
        prop_assert_eq!(report.executed, pattern.len());
        prop_assert_eq!(report.cancelled, 0);
        prop_assert!(!report.has_unknown_error);
        prop_assert!(report.failures.iter().all(|f| f.kind == FailureKind::Test));
        for failure in &report.failures {
            prop_assert_eq!(&failure.message, &format!("item {} failed", failure.index));
        }
    }

    /// Property: the worker count never exceeds the items and is never zero
    #[test]
    fn core_count_is_clamped(items in 0usize..10_000, requested in 0usize..512) {
        let workers = compute_core_count(items, requested);
        prop_assert!(workers >= 1);
        prop_assert!(workers <= items.max(1));
        if requested > 0 {
            prop_assert!(workers <= requested);
        }
    }

    /// Property: a budget never hands out more permits than it holds, and gets them all back
    #[test]
    fn budget_permits_are_conserved(capacity in 0usize..64, wanted in 0usize..128) {
        let budget = ThreadBudget::new(capacity);
        {
            let permits = budget.acquire_up_to(wanted);
            prop_assert_eq!(permits.len(), wanted.min(capacity));
            prop_assert_eq!(budget.available(), capacity - permits.len());
        }
        prop_assert_eq!(budget.available(), capacity);
    }

    /// Property: the first repetition is the earliest index whose value was already seen
    #[test]
    fn first_repetition_matches_naive_scan(values in prop::collection::vec(0u8..20, 0..40)) {
        let naive = (0..values.len()).find(|&i| values[..i].contains(&values[i]));
        prop_assert_eq!(find_first_repetition(&values), naive);
    }
}
