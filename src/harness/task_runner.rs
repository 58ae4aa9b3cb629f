//! Scheduler: run N independent work items with bounded, pull-based parallelism.
//!
//! ## Scheduling
//!
//! Workers share one atomic cursor and claim the next index with `fetch_add` until the cursor passes
//! the end. A worker that finishes a fast item immediately pulls another one, so a long-running test
//! only occupies its own worker instead of holding up a static partition.
//!
//! ## Results
//!
//! Each worker collects its failures in a private vector. The vectors are merged after
//! `std::thread::scope` joins every worker, so no worker ever sees another's in-flight result. Only
//! failures are kept; successes are counted.
//!
//! ## Worker count
//!
//! - `0`: one worker per hardware thread.
//! - `1`: strictly sequential on the calling thread, in input order (debugger mode).
//! - `n`: at most `n` workers.
//!
//! The effective count never exceeds the number of items.

use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, warn};

use super::budget::ThreadBudget;
use super::error::HarnessError;
use super::outcome::{RunOutcome, catch_escaped};

// ============================================================================
// Work items
// ============================================================================

/// One schedulable unit of work.
///
/// `index` is the item's position in the input slice; `context` is shared by every item of the run.
pub trait WorkItem<C: ?Sized>: Sync {
    fn run(&self, index: usize, context: &C) -> RunOutcome;
}

/// Adapter turning a closure into a [`WorkItem`].
pub struct WorkFn<F>(pub F);

impl<C, F> WorkItem<C> for WorkFn<F>
where
    C: ?Sized,
    F: Fn(usize, &C) -> RunOutcome + Sync,
{
    fn run(&self, index: usize, context: &C) -> RunOutcome {
        (self.0)(index, context)
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The item's own logic failed.
    Test,
    /// The harness could not classify the failure.
    Infrastructure,
    /// The item was never started because the run was cancelled.
    Cancelled,
}

/// A non-successful item, tagged with its position in the input slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl FailedItem {
    fn from_outcome(index: usize, outcome: RunOutcome) -> Option<Self> {
        let (kind, message) = match outcome {
            RunOutcome::Success => return None,
            RunOutcome::TestFailure(message) => (FailureKind::Test, message),
            RunOutcome::InfrastructureFailure(message) => (FailureKind::Infrastructure, message),
        };
        Some(Self { index, kind, message })
    }
}

/// Accounting for one `execute` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteReport {
    /// Failing items only, in completion order.
    pub failures: Vec<FailedItem>,
    /// Set when any failure could not be attributed to a test body.
    pub has_unknown_error: bool,
    /// Items that actually ran.
    pub executed: usize,
    /// Items skipped because of cancellation.
    pub cancelled: usize,
    /// Number of workers used (0 for an empty run).
    pub workers: usize,
}

impl ExecuteReport {
    /// Failures sorted by input index, for deterministic presentation.
    pub fn sorted_failures(&self) -> Vec<FailedItem> {
        let mut failures = self.failures.clone();
        failures.sort_by_key(|f| f.index);
        failures
    }

    fn absorb(&mut self, shard: WorkerShard) {
        self.executed += shard.executed;
        self.has_unknown_error |= shard.has_unknown_error;
        self.failures.extend(shard.failures);
    }
}

// ============================================================================
// Options
// ============================================================================

/// Knobs for a single `execute` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions<'a> {
    /// 0 = hardware concurrency, 1 = sequential, n = cap.
    pub worker_count: usize,
    /// When set, workers stop claiming new items.
    pub cancel: Option<&'a AtomicBool>,
    /// Shared cap on extra threads across nested runs.
    pub budget: Option<&'a ThreadBudget>,
}

impl<'a> ExecuteOptions<'a> {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_budget(mut self, budget: &'a ThreadBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Number of hardware threads, or 1 when unknown.
pub fn hardware_concurrency() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// Effective worker count for `item_count` items: never more than the items, never less than one.
pub fn compute_core_count(item_count: usize, requested: usize) -> usize {
    let available = if requested == 0 {
        hardware_concurrency()
    } else {
        requested
    };
    available.min(item_count).max(1)
}

#[cfg(not(test))]
fn check_spawn_allowed(_worker: usize) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
thread_local! {
    static FAIL_SPAWN_FROM: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// Make every spawn of worker `from` or later fail on the current thread; `None` restores spawning.
#[cfg(test)]
pub(crate) fn fail_spawns_from(from: Option<usize>) {
    FAIL_SPAWN_FROM.with(|cell| cell.set(from));
}

#[cfg(test)]
fn check_spawn_allowed(worker: usize) -> io::Result<()> {
    match FAIL_SPAWN_FROM.with(std::cell::Cell::get) {
        Some(from) if worker >= from => Err(io::Error::other("worker spawn refused")),
        _ => Ok(()),
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Failures and counters produced by one worker.
#[derive(Debug, Default)]
struct WorkerShard {
    failures: Vec<FailedItem>,
    executed: usize,
    has_unknown_error: bool,
}

impl WorkerShard {
    fn record(&mut self, index: usize, outcome: RunOutcome) {
        self.executed += 1;
        self.has_unknown_error |= outcome.has_unknown_error();
        if let Some(failed) = FailedItem::from_outcome(index, outcome) {
            self.failures.push(failed);
        }
    }
}

pub struct TaskRunner;

impl TaskRunner {
    /// Run every item once and return the failing subset.
    ///
    /// A failing or panicking item never stops the batch. The only error is a failure to start worker
    /// threads; workers already running still drain the queue, and the error carries their report.
    pub fn execute<T, C>(options: &ExecuteOptions<'_>, items: &[T], context: &C) -> Result<ExecuteReport, HarnessError>
    where
        T: WorkItem<C>,
        C: Sync + ?Sized,
    {
        if items.is_empty() {
            return Ok(ExecuteReport::default());
        }

        let workers = compute_core_count(items.len(), options.worker_count);
        if workers <= 1 {
            return Ok(Self::launch_sequential(options, items, context));
        }

        let permits = options.budget.map(|budget| budget.acquire_up_to(workers));
        let workers = permits.as_ref().map_or(workers, Vec::len);
        if workers <= 1 {
            debug!(items = items.len(), "thread budget exhausted, running sequentially");
            return Ok(Self::launch_sequential(options, items, context));
        }

        let result = Self::launch_in_parallel(options, workers, items, context);
        drop(permits);
        result
    }

    fn launch_sequential<T, C>(options: &ExecuteOptions<'_>, items: &[T], context: &C) -> ExecuteReport
    where
        T: WorkItem<C>,
        C: Sync + ?Sized,
    {
        debug!(items = items.len(), "running sequentially");

        let mut report = ExecuteReport {
            workers: 1,
            ..ExecuteReport::default()
        };
        let mut shard = WorkerShard::default();
        let mut next = 0;

        while next < items.len() && !options.is_cancelled() {
            let item = &items[next];
            let outcome = catch_escaped(|| item.run(next, context));
            shard.record(next, outcome);
            next += 1;
        }

        report.absorb(shard);
        Self::mark_cancelled(&mut report, next, items.len());
        report
    }

    fn launch_in_parallel<T, C>(
        options: &ExecuteOptions<'_>,
        workers: usize,
        items: &[T],
        context: &C,
    ) -> Result<ExecuteReport, HarnessError>
    where
        T: WorkItem<C>,
        C: Sync + ?Sized,
    {
        debug!(items = items.len(), workers, "running in parallel");

        let cursor = AtomicUsize::new(0);
        let mut report = ExecuteReport::default();
        let mut spawn_failure = None;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);

            for worker in 0..workers {
                let cursor = &cursor;
                let spawned = check_spawn_allowed(worker).and_then(|()| {
                    thread::Builder::new()
                        .name(format!("testrun-worker-{worker}"))
                        .spawn_scoped(scope, move || Self::drain(options, cursor, items, context))
                });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        warn!(worker, workers, error = %source, "failed to spawn worker thread");
                        spawn_failure = Some((worker, source));
                        break;
                    }
                }
            }

            // Nobody is pulling from the queue: drain it on the calling thread.
            if handles.is_empty() {
                report.absorb(Self::drain(options, &cursor, items, context));
            }
            report.workers = handles.len().max(1);

            for handle in handles {
                match handle.join() {
                    Ok(shard) => report.absorb(shard),
                    Err(_) => {
                        warn!("worker thread panicked outside a work item");
                        report.has_unknown_error = true;
                    }
                }
            }
        });

        let claimed = cursor.load(Ordering::SeqCst).min(items.len());
        Self::mark_cancelled(&mut report, claimed, items.len());

        let Some((spawned, source)) = spawn_failure else {
            if report.has_unknown_error {
                warn!(failures = report.failures.len(), "run finished with unknown errors");
            }
            return Ok(report);
        };

        report.has_unknown_error = true;
        warn!(
            executed = report.executed,
            failures = report.failures.len(),
            "aborting run after worker spawn failure"
        );
        Err(HarnessError::WorkerSpawn {
            spawned,
            requested: workers,
            source,
            partial: Box::new(report),
        })
    }

    /// Pull items until the queue is empty or the run is cancelled.
    fn drain<T, C>(options: &ExecuteOptions<'_>, cursor: &AtomicUsize, items: &[T], context: &C) -> WorkerShard
    where
        T: WorkItem<C>,
        C: Sync + ?Sized,
    {
        let mut shard = WorkerShard::default();

        loop {
            if options.is_cancelled() {
                break;
            }

            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(index) else {
                // All tasks have been taken.
                break;
            };

            let outcome = catch_escaped(|| item.run(index, context));
            shard.record(index, outcome);
        }

        shard
    }

    fn mark_cancelled(report: &mut ExecuteReport, first_unclaimed: usize, len: usize) {
        for index in first_unclaimed..len {
            report.failures.push(FailedItem {
                index,
                kind: FailureKind::Cancelled,
                message: "cancelled before start".to_string(),
            });
        }
        report.cancelled += len.saturating_sub(first_unclaimed);
    }
}
