//! Run configuration.

use std::num::NonZeroUsize;

use super::budget::ThreadBudget;

/// How tests are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One worker, registration order. Keeps stack traces and breakpoints predictable.
    Sequential,
    /// Pull-based thread pool, tests sorted by name. `None` uses every hardware thread.
    Parallel { max_workers: Option<NonZeroUsize> },
}

impl RunMode {
    pub fn parallel() -> Self {
        RunMode::Parallel { max_workers: None }
    }

    /// Map the "is a debugger attached" switch onto a mode.
    pub fn from_debugger_attached(is_debugger_attached: bool) -> Self {
        if is_debugger_attached {
            RunMode::Sequential
        } else {
            RunMode::parallel()
        }
    }

    /// Map a `--jobs` value: 0 = all cores, 1 = sequential, n = cap.
    pub fn from_jobs(jobs: usize) -> Self {
        match jobs {
            0 => RunMode::parallel(),
            1 => RunMode::Sequential,
            n => RunMode::Parallel {
                max_workers: NonZeroUsize::new(n),
            },
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, RunMode::Sequential)
    }

    /// Worker count in the scheduler's encoding.
    pub fn worker_count(&self) -> usize {
        match self {
            RunMode::Sequential => 1,
            RunMode::Parallel { max_workers } => max_workers.map_or(0, NonZeroUsize::get),
        }
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::parallel()
    }
}

/// Harness configuration
#[derive(Debug, Clone, Default)]
pub struct HarnessConfig {
    /// Scheduling mode
    pub mode: RunMode,
    /// Only run tests whose name contains this keyword
    pub filter: Option<String>,
    /// Return a failing exit code when any test fails (off: failures are only printed)
    pub strict_exit: bool,
    /// Thread budget for the run; `None` uses [`ThreadBudget::shared`]
    pub budget: Option<&'static ThreadBudget>,
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_strict_exit(mut self, strict_exit: bool) -> Self {
        self.strict_exit = strict_exit;
        self
    }

    pub fn with_budget(mut self, budget: &'static ThreadBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// The budget the run draws its worker threads from.
    pub fn thread_budget(&self) -> &'static ThreadBudget {
        self.budget.unwrap_or_else(ThreadBudget::shared)
    }
}
